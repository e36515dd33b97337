//! End-to-end runs of the lost/stolen device workflow against in-memory
//! collaborators: every branch of the graph, the human gate in all its
//! outcomes, and the close guarantee.

use std::sync::Arc;
use std::time::Duration;

use case_adapters::{lost_device_graph, DirectoryConnector, MdmConnector, ScriptedHumanChannel,
                    StaticListStore, TicketingConnector, EXECUTIVES_LIST, TICKET_SHORT_DESCRIPTION};
use case_core::{Case, CaseArtifact, CaseDriver, CaseEventKind, InMemoryEventStore, PromptStatus};
use serde_json::json;

fn inventory() -> Vec<serde_json::Value> {
    vec![json!({ "uuid": "U1", "userId": "u1" }),
         json!({ "uuid": "U2", "userId": "u2" })]
}

fn lists() -> Arc<StaticListStore> {
    // u2 is the only executive
    Arc::new(StaticListStore::new().with_list(EXECUTIVES_LIST, ["u2"]))
}

fn case_for_device(external_id: &str) -> Case {
    Case::new(vec![CaseArtifact::new(11, json!({ "deviceExternalId": external_id }))])
}

struct World {
    driver: CaseDriver<InMemoryEventStore>,
    mdm: Arc<MdmConnector>,
    directory: Arc<DirectoryConnector>,
    ticketing: Arc<TicketingConnector>,
}

fn world(mdm: MdmConnector, human: ScriptedHumanChannel, prompt_timeout: Duration) -> World {
    let graph = lost_device_graph("admin", prompt_timeout).unwrap();
    let mut driver = CaseDriver::in_memory(graph, Arc::new(human), lists());
    let mdm = Arc::new(mdm);
    let directory = Arc::new(DirectoryConnector::new());
    let ticketing = Arc::new(TicketingConnector::new());
    driver.register_connector(mdm.clone());
    driver.register_connector(directory.clone());
    driver.register_connector(ticketing.clone());
    World { driver, mdm, directory, ticketing }
}

fn has_event(world: &World, case: &Case, pred: impl Fn(&CaseEventKind) -> bool) -> bool {
    world.driver.events_for(case.id).iter().any(|e| pred(&e.kind))
}

#[tokio::test]
async fn non_executive_owner_gets_an_immediate_reset_and_ticket() {
    let mut w = world(MdmConnector::new(inventory()),
                      ScriptedHumanChannel::silent(),
                      Duration::from_secs(5));
    let mut case = case_for_device("U1");

    let store = w.driver.run(&mut case).await.unwrap();

    assert!(case.is_closed());
    assert_eq!(w.mdm.locked(), vec!["U1"]);
    assert_eq!(w.directory.resets(), vec!["u1"]);

    let tickets = w.ticketing.tickets();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].short_description, TICKET_SHORT_DESCRIPTION);
    assert!(tickets[0].description.contains("their password has been reset:\nu1"));
    assert!(tickets[0].description.contains("U1"));
    assert!(tickets[0].description.contains("not part of the executive team"));

    // the executive branch never engaged the human
    assert!(store.prompt("prompt_owner_decision").is_none());
    assert!(!has_event(&w, &case, |k| matches!(k, CaseEventKind::PromptRequested { .. })));

    let variants = w.driver.event_variants(case.id);
    assert_eq!(variants.first(), Some(&"O"));
    assert_eq!(variants.last(), Some(&"C"));
    assert!(variants.contains(&"J"));
}

#[tokio::test]
async fn executive_owner_approving_gets_a_reset_after_the_prompt() {
    let mut w = world(MdmConnector::new(inventory()),
                      ScriptedHumanChannel::answers_after(1, Duration::from_millis(10)),
                      Duration::from_secs(5));
    let mut case = case_for_device("U2");

    let store = w.driver.run(&mut case).await.unwrap();

    assert!(case.is_closed());
    assert_eq!(w.mdm.locked(), vec!["U2"]);
    assert_eq!(w.directory.resets(), vec!["u2"]);

    let prompt = store.prompt("prompt_owner_decision").unwrap();
    assert_eq!(prompt.status, PromptStatus::Answered);
    assert_eq!(prompt.answer, Some(1));
    assert_eq!(prompt.respondent, "admin");
    assert!(prompt.message.contains("u2"));
    assert!(prompt.message.contains("Do you wish to"));

    let tickets = w.ticketing.tickets();
    assert_eq!(tickets.len(), 1);
    assert!(tickets[0].description.contains("their password has been reset:\nu2"));
    assert!(tickets[0].description.contains("is a member of the executive team"));

    assert!(has_event(&w, &case, |k| matches!(k, CaseEventKind::PromptAnswered { response: 1, .. })));
}

#[tokio::test]
async fn executive_owner_declining_files_a_ticket_without_a_reset() {
    let mut w = world(MdmConnector::new(inventory()),
                      ScriptedHumanChannel::answers(2),
                      Duration::from_secs(5));
    let mut case = case_for_device("U2");

    let store = w.driver.run(&mut case).await.unwrap();

    assert!(case.is_closed());
    assert!(w.directory.resets().is_empty());

    let tickets = w.ticketing.tickets();
    assert_eq!(tickets.len(), 1);
    assert!(tickets[0].description.contains("decided to not reset their password:\nu2"));
    assert!(tickets[0].description.contains("Further action must be taken"));

    assert_eq!(store.prompt("prompt_owner_decision").unwrap().answer, Some(2));
    // the approved-reset branch was pruned, not run
    assert!(store.action("reset_password_approved").is_none());
}

#[tokio::test]
async fn a_silent_respondent_times_out_and_the_case_still_closes() {
    let mut w = world(MdmConnector::new(inventory()),
                      ScriptedHumanChannel::silent(),
                      Duration::from_millis(50));
    let mut case = case_for_device("U2");

    let store = w.driver.run(&mut case).await.unwrap();

    assert!(case.is_closed());
    assert!(w.directory.resets().is_empty());
    assert!(w.ticketing.tickets().is_empty());
    assert_eq!(store.prompt("prompt_owner_decision").unwrap().status,
               PromptStatus::TimedOut);
    assert!(has_event(&w, &case, |k| matches!(k, CaseEventKind::PromptTimedOut { .. })));
    assert!(has_event(&w, &case, |k| matches!(k, CaseEventKind::CaseClosed)));
}

#[tokio::test]
async fn an_unmatched_response_prunes_both_arms_and_the_case_closes() {
    // 3 is inside the accepted range but matches no decision arm
    let mut w = world(MdmConnector::new(inventory()),
                      ScriptedHumanChannel::answers(3),
                      Duration::from_secs(5));
    let mut case = case_for_device("U2");

    let store = w.driver.run(&mut case).await.unwrap();

    assert!(case.is_closed());
    assert!(w.directory.resets().is_empty());
    assert!(w.ticketing.tickets().is_empty());
    assert_eq!(store.prompt("prompt_owner_decision").unwrap().answer, Some(3));
}

#[tokio::test]
async fn an_out_of_range_response_fails_the_gate_but_not_the_case() {
    let mut w = world(MdmConnector::new(inventory()),
                      ScriptedHumanChannel::answers(500),
                      Duration::from_secs(5));
    let mut case = case_for_device("U2");

    let store = w.driver.run(&mut case).await.unwrap();

    assert!(case.is_closed());
    assert!(w.ticketing.tickets().is_empty());
    // the answer is kept on the record even though the gate rejected it
    assert_eq!(store.prompt("prompt_owner_decision").unwrap().answer, Some(500));
    assert!(has_event(&w, &case, |k| matches!(k, CaseEventKind::StepFailed { .. })));
}

#[tokio::test]
async fn a_failed_lock_is_recorded_and_the_workflow_continues() {
    let mut w = world(MdmConnector::new(inventory()).with_unreachable("U1"),
                      ScriptedHumanChannel::silent(),
                      Duration::from_secs(5));
    let mut case = case_for_device("U1");

    let store = w.driver.run(&mut case).await.unwrap();

    assert!(case.is_closed());
    assert!(w.mdm.locked().is_empty());

    let lock = store.action("lock_device").unwrap();
    assert!(!lock.success);
    assert_eq!(lock.failure_count(), 1);

    // downstream still reset the password and filed the ticket
    assert_eq!(w.directory.resets(), vec!["u1"]);
    assert_eq!(w.ticketing.tickets().len(), 1);
}

#[tokio::test]
async fn no_matching_device_closes_the_case_without_side_effects() {
    let mut w = world(MdmConnector::new(inventory()),
                      ScriptedHumanChannel::silent(),
                      Duration::from_secs(5));
    let mut case = case_for_device("U9");

    let store = w.driver.run(&mut case).await.unwrap();

    assert!(case.is_closed());
    assert!(w.mdm.locked().is_empty());
    assert!(w.directory.resets().is_empty());
    assert!(w.ticketing.tickets().is_empty());
    assert!(store.filtered("filter_device_match", "device_match").unwrap().is_empty());
    assert!(has_event(&w, &case, |k| matches!(k, CaseEventKind::StepSkipped { .. })));
}

#[tokio::test]
async fn traceability_survives_the_whole_chain() {
    let mut w = world(MdmConnector::new(inventory()),
                      ScriptedHumanChannel::silent(),
                      Duration::from_secs(5));
    let mut case = case_for_device("U1");

    let store = w.driver.run(&mut case).await.unwrap();

    // the device match recorded the originating artifact id and every
    // downstream request carried it forward
    assert_eq!(store.filtered("filter_device_match", "device_match").unwrap().artifact_ids(),
               vec![11]);
    assert_eq!(store.action("lock_device").unwrap().results[0].context_artifact, Some(11));
    assert_eq!(store.action("get_user_attributes").unwrap().results[0].context_artifact, Some(11));
    assert_eq!(store.action("reset_password_direct").unwrap().results[0].context_artifact, Some(11));
}
