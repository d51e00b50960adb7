use foodorders::config::{
    AppConfig, DynamoDbSection, MetricsBackendKind, MetricsSection, RetryModeKind, RetrySection,
    S3StorageSection, StorageBackendKind, StorageSection,
};
use foodorders::metrics::MetricsConfig;
use foodorders::storage::StorageConfig;

#[test]
fn defaults_use_local_storage_and_food_orders_table() {
    let config = AppConfig::default();

    match config.storage_runtime().expect("defaults should be valid") {
        StorageConfig::Local { root_path, table } => {
            assert_eq!(root_path, "./data");
            assert_eq!(table, "FoodOrders");
        }
        other => panic!("Unexpected storage config: {other:?}"),
    }

    assert_eq!(config.metrics.name, "OrderPrice");
    assert_eq!(config.server.port, 3000);
}

#[test]
fn s3_backend_requires_bucket_and_region() {
    let mut config = AppConfig {
        storage: StorageSection {
            backend: StorageBackendKind::S3,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(config.storage_runtime().is_err(), "missing s3 section");

    config.storage.s3 = Some(S3StorageSection {
        bucket: " ".into(),
        region: "eu-west-1".into(),
        ..Default::default()
    });
    assert!(config.storage_runtime().is_err(), "blank bucket");

    config.storage.s3 = Some(S3StorageSection {
        bucket: "orders".into(),
        region: String::new(),
        ..Default::default()
    });
    assert!(config.storage_runtime().is_err(), "blank region");
}

#[test]
fn s3_prefix_defaults_to_table_name() {
    let config = AppConfig {
        storage: StorageSection {
            backend: StorageBackendKind::S3,
            s3: Some(S3StorageSection {
                bucket: "bucket".into(),
                region: "region".into(),
                endpoint: None,
                prefix: Some("  ".into()),
            }),
            ..Default::default()
        },
        ..Default::default()
    };

    match config.storage_runtime().expect("S3 configuration should be valid") {
        StorageConfig::S3 { prefix, retry, .. } => {
            assert_eq!(prefix, "FoodOrders");
            assert_eq!(retry.max_attempts, 3);
            assert!(!retry.adaptive);
        }
        other => panic!("Unexpected storage config: {other:?}"),
    }
}

#[test]
fn dynamodb_backend_propagates_retry_and_endpoint() {
    let config = AppConfig {
        storage: StorageSection {
            backend: StorageBackendKind::DynamoDb,
            table: "Orders".into(),
            dynamodb: Some(DynamoDbSection {
                region: Some("us-east-1".into()),
                endpoint: Some(" ".into()),
            }),
            retry: RetrySection {
                max_attempts: 5,
                mode: RetryModeKind::Adaptive,
            },
            ..Default::default()
        },
        ..Default::default()
    };

    match config.storage_runtime().expect("DynamoDB configuration should be valid") {
        StorageConfig::DynamoDb {
            table,
            region,
            endpoint,
            retry,
        } => {
            assert_eq!(table, "Orders");
            assert_eq!(region.as_deref(), Some("us-east-1"));
            assert!(endpoint.is_none());
            assert_eq!(retry.max_attempts, 5);
            assert!(retry.adaptive);
        }
        other => panic!("Unexpected storage config: {other:?}"),
    }
}

#[test]
fn zero_retry_attempts_and_blank_table_are_rejected() {
    let mut config = AppConfig::default();
    config.storage.retry.max_attempts = 0;
    assert!(config.storage_runtime().is_err());

    let mut config = AppConfig::default();
    config.storage.table = "   ".into();
    assert!(config.storage_runtime().is_err());
}

#[test]
fn metrics_can_be_disabled() {
    let config = AppConfig {
        metrics: MetricsSection {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(matches!(config.metrics_runtime(), MetricsConfig::Disabled));

    let config = AppConfig {
        metrics: MetricsSection {
            backend: MetricsBackendKind::None,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(matches!(config.metrics_runtime(), MetricsConfig::Disabled));

    match AppConfig::default().metrics_runtime() {
        MetricsConfig::Prometheus { namespace } => assert_eq!(namespace, "FoodOrders"),
        other => panic!("Unexpected metrics config: {other:?}"),
    }
}

#[test]
fn environment_overrides_nested_underscore_fields() {
    std::env::set_var("FOODORDERS_STORAGE__RETRY__MAX_ATTEMPTS", "7");
    std::env::set_var("FOODORDERS_STORAGE__LOCAL__ROOT_PATH", "/srv/orders");
    std::env::set_var("FOODORDERS_SERVER__PORT", "8081");

    let loaded = AppConfig::load();

    std::env::remove_var("FOODORDERS_STORAGE__RETRY__MAX_ATTEMPTS");
    std::env::remove_var("FOODORDERS_STORAGE__LOCAL__ROOT_PATH");
    std::env::remove_var("FOODORDERS_SERVER__PORT");

    let config = loaded.expect("environment configuration should load");
    assert_eq!(config.storage.retry.max_attempts, 7);
    assert_eq!(config.server.port, 8081);

    match config.storage_runtime().expect("local configuration should be valid") {
        StorageConfig::Local { root_path, table } => {
            assert_eq!(root_path, "/srv/orders");
            assert_eq!(table, "FoodOrders");
        }
        other => panic!("Unexpected storage config: {other:?}"),
    }
}
