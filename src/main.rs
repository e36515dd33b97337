//! Demo runner: executes the lost/stolen device workflow against
//! in-memory collaborators and prints what happened.
//!
//! Tunables (environment or `.env`): `CASEFLOW_DEVICE_ID`,
//! `CASEFLOW_RESPONDENT`, `CASEFLOW_PROMPT_TIMEOUT_SECS`,
//! `CASEFLOW_PROMPT_RESPONSE`.

mod config;

use std::sync::Arc;

use case_adapters::{lost_device_graph, DirectoryConnector, MdmConnector, ScriptedHumanChannel,
                    StaticListStore, TicketingConnector, EXECUTIVES_LIST};
use case_core::{Case, CaseArtifact, CaseDriver};
use serde_json::json;

use config::CaseflowConfig;

#[tokio::main]
async fn main() {
    env_logger::init();
    let cfg = CaseflowConfig::from_env();

    let graph = match lost_device_graph(&cfg.respondent, cfg.prompt_timeout) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("[caseflow] invalid workflow graph: {e}");
            std::process::exit(2);
        }
    };

    // Demo world: two enrolled devices, one executive owner.
    let mdm = Arc::new(MdmConnector::new(vec![json!({ "uuid": "U1", "userId": "u1" }),
                                              json!({ "uuid": "U2", "userId": "u2" })]));
    let directory = Arc::new(DirectoryConnector::new().with_user("u1", json!({ "username": "u1", "title": "analyst" }))
                                                      .with_user("u2", json!({ "username": "u2", "title": "cfo" })));
    let ticketing = Arc::new(TicketingConnector::new());
    let lists = Arc::new(StaticListStore::new().with_list(EXECUTIVES_LIST, ["u2"]));
    let human = Arc::new(ScriptedHumanChannel::answers(cfg.prompt_response));

    let mut driver = CaseDriver::in_memory(graph, human, lists);
    driver.register_connector(mdm.clone());
    driver.register_connector(directory.clone());
    driver.register_connector(ticketing.clone());

    let mut case = Case::new(vec![CaseArtifact::new(1, json!({ "deviceExternalId": cfg.device_id }))]);
    println!("case {} opened for device {}", case.id, cfg.device_id);

    let store = match driver.run(&mut case).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("[caseflow] run failed: {e}");
            std::process::exit(5);
        }
    };

    println!("case status: {:?}", case.status);
    println!("locked devices: {:?}", mdm.locked());
    println!("password resets: {:?}", directory.resets());
    for ticket in ticketing.tickets() {
        println!("ticket {} [{}]\n{}", ticket.id, ticket.short_description, ticket.description);
    }
    if let Some(prompt) = store.prompt("prompt_owner_decision") {
        println!("prompt to {}: status {:?}, answer {:?}", prompt.respondent, prompt.status, prompt.answer);
    }
    println!("events: {}", driver.event_variants(case.id).join(" "));
}
