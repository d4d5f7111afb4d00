use super::{Config, HatsuneBox};
use std::time::Duration;

/// Creates a new test configuration: two simulated units, limits watcher on.
pub fn new_test_config() -> Config {
    Config {
        hatsune: HatsuneBox {
            env: super::TEST.to_string(),
            logs: Some(super::Logs {
                level: Some("debug".to_string()),
            }),
            api: Some(super::Api {
                name: Some("hatsune:8041".to_string()),
                port: Some("8041".to_string()),
            }),
            platform: super::Platform {
                kind: super::PlatformKind::Sim,
                sysfs: None,
                sim: Some(super::Sim {
                    units: vec![
                        super::SimUnit {
                            id: 0,
                            min: 800_000,
                            max: 2_000_000,
                            cur: 1_200_000,
                            frequencies: vec![800_000, 1_200_000, 1_600_000, 1_800_000, 2_000_000],
                        },
                        super::SimUnit {
                            id: 1,
                            min: 400_000,
                            max: 1_400_000,
                            cur: 1_000_000,
                            frequencies: vec![],
                        },
                    ],
                }),
            },
            units: None,
            limits: Some(super::Limits {
                enabled: true,
                poll_interval: Some(Duration::from_millis(10)),
            }),
            shutdown: Some(super::Shutdown {
                timeout: Some(Duration::from_secs(1)),
            }),
        },
    }
}
