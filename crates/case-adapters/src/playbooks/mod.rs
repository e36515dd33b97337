pub mod lost_device;
