//! # CRD Generator
//!
//! Generates the Kubernetes CustomResourceDefinition YAML for `CloudConfig`.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/cloudconfig.yaml
//!
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use cloud_config_operator::crd::CloudConfig;
use kube::core::CustomResourceExt;

fn main() {
    let crd = CloudConfig::crd();

    match serde_yaml::to_string(&crd) {
        Ok(yaml) => {
            println!("# This file is auto-generated by crdgen");
            println!("# DO NOT EDIT THIS FILE MANUALLY");
            println!("---");
            print!("{yaml}");
        }
        Err(e) => {
            eprintln!("Failed to serialize CRD to YAML: {e}");
            std::process::exit(1);
        }
    }
}
