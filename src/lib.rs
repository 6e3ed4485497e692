pub mod config;
pub mod provisioner;

pub mod core {
    pub mod common;
    pub mod instance_type;
    pub mod labels;
    pub mod node;
    pub mod node_pool;
    pub mod pod;
    pub mod requirements;
}

pub mod metrics {
    pub mod collector;
    pub mod printer;
    pub mod sink;
}

pub mod scheduling {
    pub mod errors;
    pub mod existing_node;
    pub mod host_ports;
    pub mod nodeclaim;
    pub mod options;
    pub mod pod_data;
    pub mod queue;
    pub mod reservation;
    pub mod results;
    pub mod scheduler;
    pub mod strategy;
    pub mod template;
    pub mod topology;
}

pub mod test_util {
    pub mod helpers;
}
