//! Payload validation for change requests

use crate::domain::{
    AclSpec, AclType, ConnectorSpec, Environment, EnvironmentParams, RequestOperation,
    RequestPayload, ResourceKind, TopicSpec,
};
use crate::error::{validation_error, ApiResult};
use once_cell::sync::Lazy;
use regex::Regex;
use validator::Validate;

static TOPIC_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._-]*$").unwrap_or_else(|e| panic!("invalid topic name pattern: {}", e))
});

#[derive(Debug, Validate)]
struct TopicName {
    #[validate(
        length(min = 3, max = 255, message = "Topic name must be between 3 and 255 characters"),
        custom(function = "topic_name_chars")
    )]
    name: String,
}

fn topic_name_chars(name: &str) -> Result<(), validator::ValidationError> {
    if !TOPIC_NAME_PATTERN.is_match(name) {
        let mut err = validator::ValidationError::new("invalid_topic_name");
        err.message =
            Some("Topic name can only contain letters, digits, period, underscore, hyphen.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_topic_name(name: &str, params: &EnvironmentParams) -> ApiResult<()> {
    TopicName { name: name.to_string() }
        .validate()
        .map_err(|e| validation_error(e.to_string()))?;

    // the remainder after a mandatory prefix/suffix must itself be non-empty
    if !params.topic_prefix.is_empty()
        && !params
            .topic_prefix
            .iter()
            .any(|p| name.starts_with(p.as_str()) && name.len() > p.len())
    {
        return Err(validation_error(format!(
            "Topic name must start with {}.",
            params.topic_prefix.join(" or ")
        )));
    }

    if !params.topic_suffix.is_empty()
        && !params
            .topic_suffix
            .iter()
            .any(|s| name.ends_with(s.as_str()) && name.len() > s.len())
    {
        return Err(validation_error(format!(
            "Topic name must end with {}.",
            params.topic_suffix.join(" or ")
        )));
    }

    Ok(())
}

fn validate_topic(name: &str, spec: &TopicSpec, env: &Environment) -> ApiResult<()> {
    spec.validate().map_err(|e| validation_error(e.to_string()))?;
    validate_topic_name(name, &env.params)?;

    if let Some(max) = env.params.max_partitions {
        if spec.partitions > max {
            return Err(validation_error(format!(
                "{} partitions can not be bigger than {}",
                spec.partitions, max
            )));
        }
    }
    if let Some(max) = env.params.max_replication_factor {
        if spec.replication_factor > max {
            return Err(validation_error(format!(
                "Replication factor {} can not be bigger than {}",
                spec.replication_factor, max
            )));
        }
    }
    Ok(())
}

fn validate_acl(spec: &AclSpec) -> ApiResult<()> {
    spec.validate().map_err(|e| validation_error(e.to_string()))?;

    if spec.principals.iter().any(|p| p.trim().is_empty()) {
        return Err(validation_error("Principals can not be blank"));
    }
    if spec.hosts.is_empty() || spec.hosts.iter().any(|h| h.trim().is_empty()) {
        return Err(validation_error("At least one host is required"));
    }
    if spec.acl_type == AclType::Consumer
        && spec.consumer_group.as_deref().map_or(true, |g| g.trim().is_empty())
    {
        return Err(validation_error("Consumer ACLs require a consumer group"));
    }
    Ok(())
}

fn validate_connector(name: &str, spec: &ConnectorSpec) -> ApiResult<()> {
    if name.trim().is_empty() || name.chars().any(char::is_whitespace) {
        return Err(validation_error("Connector name can not be empty or contain whitespace"));
    }

    let config = spec
        .config
        .as_object()
        .ok_or_else(|| validation_error("Connector config must be a JSON object"))?;
    for key in ["connector.class", "tasks.max"] {
        if !config.contains_key(key) {
            return Err(validation_error(format!("Connector config is missing '{}'", key)));
        }
    }
    Ok(())
}

/// The name a request is filed under; ACLs derive it from their payload
pub fn resource_name(kind: ResourceKind, name: &str, payload: Option<&RequestPayload>) -> String {
    match (kind, payload) {
        (ResourceKind::Acl, Some(RequestPayload::Acl(spec))) => spec.resource_key(),
        _ => name.trim().to_string(),
    }
}

/// Check a payload against the kind, operation and target environment
pub fn validate_payload(
    kind: ResourceKind,
    name: &str,
    operation: RequestOperation,
    payload: Option<&RequestPayload>,
    env: &Environment,
) -> ApiResult<()> {
    if name.is_empty() {
        return Err(validation_error("Resource name is required"));
    }

    let payload = match (operation, payload) {
        (RequestOperation::Delete, None) => return Ok(()),
        (_, Some(payload)) => payload,
        (_, None) => {
            return Err(validation_error(format!(
                "{} requests need a {} payload",
                operation, kind
            )))
        }
    };

    if payload.kind() != kind {
        return Err(validation_error(format!(
            "Payload of type {} sent to {} requests",
            payload.kind(),
            kind
        )));
    }

    if operation == RequestOperation::Delete {
        return Ok(());
    }

    match payload {
        RequestPayload::Topic(spec) => validate_topic(name, spec, env),
        RequestPayload::Acl(spec) => validate_acl(spec),
        RequestPayload::Connector(spec) => validate_connector(name, spec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AclPatternType;
    use crate::testing::env;
    use serde_json::json;

    fn topic(partitions: u32, replication_factor: u32) -> RequestPayload {
        RequestPayload::Topic(TopicSpec {
            partitions,
            replication_factor,
            advanced_config: Default::default(),
            description: "orders placed".into(),
        })
    }

    fn acl(acl_type: AclType, consumer_group: Option<&str>) -> AclSpec {
        AclSpec {
            acl_type,
            topic: "orders".into(),
            principals: vec!["CN=orders-service".into()],
            hosts: vec!["*".into()],
            consumer_group: consumer_group.map(String::from),
            pattern_type: AclPatternType::Literal,
        }
    }

    #[test]
    fn test_topic_name_rules() {
        let dev = env("1");
        let create = RequestOperation::Create;
        assert!(validate_payload(ResourceKind::Topic, "orders", create, Some(&topic(3, 2)), &dev).is_ok());
        assert!(validate_payload(ResourceKind::Topic, "ab", create, Some(&topic(3, 2)), &dev).is_err());
        assert!(validate_payload(ResourceKind::Topic, "orders!", create, Some(&topic(3, 2)), &dev).is_err());
        let long = "a".repeat(256);
        assert!(validate_payload(ResourceKind::Topic, &long, create, Some(&topic(3, 2)), &dev).is_err());
    }

    #[test]
    fn test_topic_prefix_and_limits() {
        let tst = env("2");
        let create = RequestOperation::Create;
        assert!(validate_payload(ResourceKind::Topic, "orders", create, Some(&topic(2, 2)), &tst).is_err());
        assert!(validate_payload(ResourceKind::Topic, "tst_", create, Some(&topic(2, 2)), &tst).is_err());
        assert!(validate_payload(ResourceKind::Topic, "tst_orders", create, Some(&topic(2, 2)), &tst).is_ok());
        assert!(validate_payload(ResourceKind::Topic, "tst_orders", create, Some(&topic(5, 2)), &tst).is_err());
        assert!(validate_payload(ResourceKind::Topic, "tst_orders", create, Some(&topic(2, 3)), &tst).is_err());
    }

    #[test]
    fn test_consumer_acl_needs_group() {
        assert!(validate_acl(&acl(AclType::Producer, None)).is_ok());
        assert!(validate_acl(&acl(AclType::Consumer, None)).is_err());
        assert!(validate_acl(&acl(AclType::Consumer, Some(" "))).is_err());
        assert!(validate_acl(&acl(AclType::Consumer, Some("billing"))).is_ok());

        let mut no_host = acl(AclType::Producer, None);
        no_host.hosts.clear();
        assert!(validate_acl(&no_host).is_err());
    }

    #[test]
    fn test_connector_config_shape() {
        let ok = ConnectorSpec {
            config: json!({"connector.class": "FileStreamSink", "tasks.max": "1"}),
        };
        assert!(validate_connector("billing-sink", &ok).is_ok());

        let missing = ConnectorSpec {
            config: json!({"connector.class": "FileStreamSink"}),
        };
        assert!(validate_connector("billing-sink", &missing).is_err());

        let not_object = ConnectorSpec { config: json!(["x"]) };
        assert!(validate_connector("billing-sink", &not_object).is_err());
        assert!(validate_connector("billing sink", &ok).is_err());
    }

    #[test]
    fn test_delete_needs_no_payload_and_kind_must_match() {
        let dev = env("1");
        assert!(validate_payload(ResourceKind::Topic, "orders", RequestOperation::Delete, None, &dev).is_ok());
        assert!(validate_payload(ResourceKind::Topic, "orders", RequestOperation::Update, None, &dev).is_err());
        assert!(validate_payload(ResourceKind::Acl, "orders", RequestOperation::Create, Some(&topic(1, 1)), &dev).is_err());
    }

    #[test]
    fn test_acl_resource_name_comes_from_spec() {
        let payload = RequestPayload::Acl(acl(AclType::Producer, None));
        assert_eq!(
            resource_name(ResourceKind::Acl, "ignored", Some(&payload)),
            "PRODUCER:orders:CN=orders-service"
        );
        assert_eq!(resource_name(ResourceKind::Topic, " orders ", None), "orders");
    }
}
