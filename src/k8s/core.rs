//! Core Kubernetes types embedded in custom resource specs.
//!
//! Only the parts of the upstream `core/v1` and `meta/v1` types that custom
//! resources commonly embed are modelled.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::k8s::object::{list, single};
use crate::k8s_object;
use crate::schema::{Attribute, AttributeFlags, AttributeType};

/// A value that is either a number or a name, such as a port or a percentage.
///
/// Configured as a string and written to the manifest as configured; only a
/// JSON number decodes to [`IntOrString::Int`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntOrString {
    /// A numeric value.
    Int(i32),
    /// A named value (`http`, `25%`).
    String(String),
}

impl From<&str> for IntOrString {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i32> for IntOrString {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl fmt::Display for IntOrString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{}", n),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl Serialize for IntOrString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Int(n) => serializer.serialize_i32(*n),
            Self::String(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for IntOrString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i32),
            String(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Self::Int(n),
            Raw::String(s) => Self::String(s),
        })
    }
}

fn string_map() -> Attribute {
    Attribute::optional_string_map()
}

fn protocol() -> Attribute {
    Attribute::optional_string().one_of(["TCP", "UDP", "SCTP"])
}

k8s_object! {
    /// A label query over a set of resources.
    pub struct LabelSelector as "camelCase" {
        /// Map of {key,value} pairs; each is equivalent to an `In` expression with a single value.
        match_labels: BTreeMap<String, String> => string_map(),
        /// A list of label selector requirements. The requirements are ANDed.
        match_expressions: Vec<LabelSelectorRequirement> => list::<LabelSelectorRequirement>(),
    }
}

k8s_object! {
    /// A selector that contains values, a key, and an operator that relates the key and values.
    pub struct LabelSelectorRequirement as "camelCase" {
        /// The label key that the selector applies to.
        key: String => Attribute::required_string(),
        /// A key's relationship to a set of values.
        operator: String => Attribute::required_string().one_of(["In", "NotIn", "Exists", "DoesNotExist"]),
        /// An array of string values. Must be empty for `Exists` and `DoesNotExist`.
        values: Vec<String> => Attribute::optional_string_list(),
    }
}

k8s_object! {
    /// Compute resources required by a container.
    pub struct ResourceRequirements as "camelCase" {
        /// Maximum amount of compute resources allowed.
        limits: BTreeMap<String, String> => string_map(),
        /// Minimum amount of compute resources required.
        requests: BTreeMap<String, String> => string_map(),
    }
}

k8s_object! {
    /// An environment variable present in a container.
    pub struct EnvVar as "camelCase" {
        /// Name of the environment variable.
        name: String => Attribute::required_string(),
        /// Value of the environment variable.
        value: String => Attribute::optional_string(),
        /// Source for the environment variable's value.
        value_from: EnvVarSource => single::<EnvVarSource>(),
    }
}

k8s_object! {
    /// Source for an environment variable's value.
    pub struct EnvVarSource as "camelCase" {
        /// Selects a key of a ConfigMap.
        config_map_key_ref: KeySelector => single::<KeySelector>(),
        /// Selects a key of a Secret in the pod's namespace.
        secret_key_ref: KeySelector => single::<KeySelector>(),
        /// Selects a field of the pod.
        field_ref: ObjectFieldSelector => single::<ObjectFieldSelector>(),
    }
}

k8s_object! {
    /// Selects a key from a ConfigMap or Secret.
    pub struct KeySelector as "camelCase" {
        /// The key to select.
        key: String => Attribute::required_string(),
        /// Name of the referent.
        name: String => Attribute::optional_string(),
        /// Specify whether the referent or its key must be defined.
        optional: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// Selects a field of an object.
    pub struct ObjectFieldSelector as "camelCase" {
        /// Version of the schema the field path is written in terms of.
        api_version: String => Attribute::optional_string(),
        /// Path of the field to select.
        field_path: String => Attribute::required_string(),
    }
}

k8s_object! {
    /// A set of environment variables taken from a ConfigMap or Secret.
    pub struct EnvFromSource as "camelCase" {
        /// An identifier to prepend to each key.
        prefix: String => Attribute::optional_string(),
        /// The ConfigMap to select from.
        config_map_ref: LocalObjectReference => single::<LocalObjectReference>(),
        /// The Secret to select from.
        secret_ref: LocalObjectReference => single::<LocalObjectReference>(),
    }
}

k8s_object! {
    /// A reference to an object in the same namespace.
    pub struct LocalObjectReference as "camelCase" {
        /// Name of the referent.
        name: String => Attribute::required_string(),
        /// Specify whether the referent must be defined.
        optional: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// A network port in a single container.
    pub struct ContainerPort as "camelCase" {
        /// Name of the port, referred to by services.
        name: String => Attribute::optional_string(),
        /// Number of the port to expose on the pod's IP address.
        container_port: i32 => Attribute::required_int64(),
        /// Number of the port to expose on the host.
        host_port: i32 => Attribute::optional_int64(),
        /// What host IP to bind the external port to.
        #[yaml = "hostIP"]
        host_ip: String => Attribute::optional_string(),
        /// Protocol for the port.
        protocol: String => protocol(),
    }
}

k8s_object! {
    /// A mounting of a volume within a container.
    pub struct VolumeMount as "camelCase" {
        /// Must match the name of a volume.
        name: String => Attribute::required_string(),
        /// Path within the container at which the volume should be mounted.
        mount_path: String => Attribute::required_string(),
        /// Path within the volume from which the container's volume should be mounted.
        sub_path: String => Attribute::optional_string(),
        /// Mounted read-only if true.
        read_only: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// Security options a container runs with.
    pub struct SecurityContext as "camelCase" {
        /// Run the container in privileged mode.
        privileged: bool => Attribute::optional_bool(),
        /// Whether a process can gain more privileges than its parent process.
        allow_privilege_escalation: bool => Attribute::optional_bool(),
        /// Whether the container has a read-only root filesystem.
        read_only_root_filesystem: bool => Attribute::optional_bool(),
        /// The UID to run the entrypoint of the container process.
        run_as_user: i64 => Attribute::optional_int64(),
        /// The GID to run the entrypoint of the container process.
        run_as_group: i64 => Attribute::optional_int64(),
        /// Indicates that the container must run as a non-root user.
        run_as_non_root: bool => Attribute::optional_bool(),
        /// The capabilities to add or drop.
        capabilities: Capabilities => single::<Capabilities>(),
    }
}

k8s_object! {
    /// POSIX capabilities added to or removed from a running container.
    pub struct Capabilities as "camelCase" {
        /// Added capabilities.
        add: Vec<String> => Attribute::optional_string_list(),
        /// Removed capabilities.
        drop: Vec<String> => Attribute::optional_string_list(),
    }
}

k8s_object! {
    /// Pod-level security attributes.
    pub struct PodSecurityContext as "camelCase" {
        /// The UID to run the entrypoint of the container process.
        run_as_user: i64 => Attribute::optional_int64(),
        /// The GID to run the entrypoint of the container process.
        run_as_group: i64 => Attribute::optional_int64(),
        /// Indicates that the container must run as a non-root user.
        run_as_non_root: bool => Attribute::optional_bool(),
        /// A special supplemental group that applies to all containers in a pod.
        fs_group: i64 => Attribute::optional_int64(),
        /// Groups applied to the first process run in each container.
        supplemental_groups: Vec<i64> => Attribute::new(
            AttributeType::list(AttributeType::Int64),
            AttributeFlags::optional(),
        ),
    }
}

k8s_object! {
    /// An action based on HTTP GET requests.
    pub struct HttpGetAction as "camelCase" {
        /// Path to access on the HTTP server.
        path: String => Attribute::optional_string(),
        /// Name or number of the port to access on the container.
        port: IntOrString => Attribute::required_string(),
        /// Scheme to use for connecting to the host.
        scheme: String => Attribute::optional_string().one_of(["HTTP", "HTTPS"]),
    }
}

k8s_object! {
    /// A health check performed against a container.
    pub struct Probe as "camelCase" {
        /// The HTTP request to perform.
        http_get: HttpGetAction => single::<HttpGetAction>(),
        /// Seconds after the container has started before probes are initiated.
        initial_delay_seconds: i32 => Attribute::optional_int64(),
        /// Seconds after which the probe times out.
        timeout_seconds: i32 => Attribute::optional_int64(),
        /// How often (in seconds) to perform the probe.
        period_seconds: i32 => Attribute::optional_int64(),
        /// Minimum consecutive successes for the probe to be considered successful.
        success_threshold: i32 => Attribute::optional_int64(),
        /// Minimum consecutive failures for the probe to be considered failed.
        failure_threshold: i32 => Attribute::optional_int64(),
    }
}

k8s_object! {
    /// A single application container to run within a pod.
    pub struct Container as "camelCase" {
        /// Name of the container, unique within the pod.
        name: String => Attribute::required_string(),
        /// Container image name.
        image: String => Attribute::optional_string(),
        /// Image pull policy.
        image_pull_policy: String => Attribute::optional_string().one_of(["Always", "Never", "IfNotPresent"]),
        /// Entrypoint array.
        command: Vec<String> => Attribute::optional_string_list(),
        /// Arguments to the entrypoint.
        args: Vec<String> => Attribute::optional_string_list(),
        /// Container's working directory.
        working_dir: String => Attribute::optional_string(),
        /// Ports to expose from the container.
        ports: Vec<ContainerPort> => list::<ContainerPort>(),
        /// Environment variables to set in the container.
        env: Vec<EnvVar> => list::<EnvVar>(),
        /// Sources to populate environment variables in the container.
        env_from: Vec<EnvFromSource> => list::<EnvFromSource>(),
        /// Compute resources required by this container.
        resources: ResourceRequirements => single::<ResourceRequirements>(),
        /// Volumes to mount into the container's filesystem.
        volume_mounts: Vec<VolumeMount> => list::<VolumeMount>(),
        /// Periodic probe of container liveness.
        liveness_probe: Probe => single::<Probe>(),
        /// Periodic probe of container service readiness.
        readiness_probe: Probe => single::<Probe>(),
        /// Security options the container should be run with.
        security_context: SecurityContext => single::<SecurityContext>(),
    }
}

k8s_object! {
    /// A toleration of a node taint.
    pub struct Toleration as "camelCase" {
        /// The taint key that the toleration applies to.
        key: String => Attribute::optional_string(),
        /// Relationship of the key to the value.
        operator: String => Attribute::optional_string().one_of(["Exists", "Equal"]),
        /// The taint value the toleration matches to.
        value: String => Attribute::optional_string(),
        /// The taint effect to match.
        effect: String => Attribute::optional_string().one_of(["NoSchedule", "PreferNoSchedule", "NoExecute"]),
        /// How long the toleration tolerates the taint once it is added.
        toleration_seconds: i64 => Attribute::optional_int64(),
    }
}

k8s_object! {
    /// Selects the nodes a pod may be scheduled onto.
    pub struct NodeSelectorTerm as "camelCase" {
        /// A list of node selector requirements by node labels.
        match_expressions: Vec<LabelSelectorRequirement> => list::<LabelSelectorRequirement>(),
    }
}

k8s_object! {
    /// Node affinity scheduling rules.
    pub struct NodeAffinity as "camelCase" {
        /// Terms that must be satisfied for the pod to be scheduled onto a node.
        required_during_scheduling_ignored_during_execution: NodeSelector => single::<NodeSelector>(),
    }
}

k8s_object! {
    /// A union of node selector terms.
    pub struct NodeSelector as "camelCase" {
        /// A list of node selector terms. The terms are ORed.
        node_selector_terms: Vec<NodeSelectorTerm> => list::<NodeSelectorTerm>(),
    }
}

k8s_object! {
    /// Scheduling constraints of a pod.
    pub struct Affinity as "camelCase" {
        /// Node affinity scheduling rules for the pod.
        node_affinity: NodeAffinity => single::<NodeAffinity>(),
    }
}

k8s_object! {
    /// A ConfigMap whose keys are projected into a volume.
    pub struct ConfigMapVolumeSource as "camelCase" {
        /// Name of the ConfigMap.
        name: String => Attribute::required_string(),
        /// Mode bits used to set permissions on created files.
        default_mode: i32 => Attribute::optional_int64(),
        /// Specify whether the ConfigMap or its keys must be defined.
        optional: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// A Secret whose keys are projected into a volume.
    pub struct SecretVolumeSource as "camelCase" {
        /// Name of the Secret in the pod's namespace.
        secret_name: String => Attribute::required_string(),
        /// Mode bits used to set permissions on created files.
        default_mode: i32 => Attribute::optional_int64(),
        /// Specify whether the Secret or its keys must be defined.
        optional: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// A temporary directory that shares a pod's lifetime.
    pub struct EmptyDirVolumeSource as "camelCase" {
        /// Storage medium backing the directory.
        medium: String => Attribute::optional_string(),
        /// Total amount of local storage required.
        size_limit: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// A reference to a PersistentVolumeClaim in the same namespace.
    pub struct PersistentVolumeClaimVolumeSource as "camelCase" {
        /// Name of the PersistentVolumeClaim.
        claim_name: String => Attribute::required_string(),
        /// Force the volume to be mounted read-only.
        read_only: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// A named volume in a pod.
    pub struct Volume as "camelCase" {
        /// Name of the volume.
        name: String => Attribute::required_string(),
        /// A ConfigMap that should populate this volume.
        config_map: ConfigMapVolumeSource => single::<ConfigMapVolumeSource>(),
        /// A Secret that should populate this volume.
        secret: SecretVolumeSource => single::<SecretVolumeSource>(),
        /// A temporary directory that shares the pod's lifetime.
        empty_dir: EmptyDirVolumeSource => single::<EmptyDirVolumeSource>(),
        /// A reference to a PersistentVolumeClaim.
        persistent_volume_claim: PersistentVolumeClaimVolumeSource => single::<PersistentVolumeClaimVolumeSource>(),
    }
}

k8s_object! {
    /// A port exposed by a service.
    pub struct ServicePort as "camelCase" {
        /// Name of this port within the service.
        name: String => Attribute::optional_string(),
        /// Protocol for the port.
        protocol: String => protocol(),
        /// The port that will be exposed by this service.
        port: i32 => Attribute::required_int64(),
        /// Number or name of the port to access on the pods targeted by the service.
        target_port: IntOrString => Attribute::optional_string(),
        /// The port on each node on which this service is exposed.
        node_port: i32 => Attribute::optional_int64(),
    }
}

k8s_object! {
    /// Spread of new pods during a rolling update.
    pub struct RollingUpdateDeployment as "camelCase" {
        /// Maximum number of pods that can be scheduled above the desired number.
        max_surge: IntOrString => Attribute::optional_string(),
        /// Maximum number of pods that can be unavailable during the update.
        max_unavailable: IntOrString => Attribute::optional_string(),
    }
}

k8s_object! {
    /// How existing pods are replaced with new ones.
    pub struct DeploymentStrategy as "camelCase" {
        /// Type of deployment.
        #[yaml = "type"]
        strategy_type: String => Attribute::optional_string().one_of(["Recreate", "RollingUpdate"]),
        /// Rolling update config parameters.
        rolling_update: RollingUpdateDeployment => single::<RollingUpdateDeployment>(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::object::ObjectSchema;
    use serde_json::json;

    #[test]
    fn test_int_or_string() {
        let port: IntOrString = serde_json::from_value(json!("3000")).unwrap();
        assert_eq!(port, IntOrString::String("3000".to_string()));

        let port: IntOrString = serde_json::from_value(json!("grafana-http")).unwrap();
        assert_eq!(port, IntOrString::String("grafana-http".to_string()));

        let port: IntOrString = serde_json::from_value(json!(8080)).unwrap();
        assert_eq!(port, IntOrString::from(8080));
        assert_eq!(serde_yaml::to_string(&port).unwrap(), "8080\n");

        assert_eq!(serde_yaml::to_string(&IntOrString::from("25%")).unwrap(), "25%\n");
        assert_eq!(serde_yaml::to_string(&IntOrString::from("3000")).unwrap(), "'3000'\n");
    }

    #[test]
    fn test_int_or_string_keeps_configured_text() {
        for text in ["08080", "+80", "3000"] {
            let value: IntOrString = serde_json::from_value(json!(text)).unwrap();
            assert_eq!(value.to_string(), text);

            let yaml: serde_yaml::Value =
                serde_yaml::from_str(&serde_yaml::to_string(&value).unwrap()).unwrap();
            assert_eq!(yaml, serde_yaml::Value::String(text.to_string()));
        }

        let port: ServicePort = serde_json::from_value(json!({
            "port": 80,
            "target_port": "08080"
        }))
        .unwrap();
        let doc: serde_yaml::Value =
            serde_yaml::from_str(&serde_yaml::to_string(&port).unwrap()).unwrap();
        assert_eq!(doc["targetPort"], serde_yaml::Value::from("08080"));
        assert_eq!(doc["port"], serde_yaml::Value::Number(80.into()));
    }

    #[test]
    fn test_container_port_host_ip() {
        let port: ContainerPort = serde_json::from_value(json!({
            "name": "grafana",
            "container_port": 3000,
            "host_ip": "0.0.0.0",
            "protocol": "TCP"
        }))
        .unwrap();

        let yaml = serde_yaml::to_string(&port).unwrap();
        assert_eq!(
            yaml,
            "name: grafana\ncontainerPort: 3000\nhostIP: 0.0.0.0\nprotocol: TCP\n"
        );
    }

    #[test]
    fn test_strategy_type_key() {
        let strategy: DeploymentStrategy = serde_json::from_value(json!({
            "strategy_type": "RollingUpdate",
            "rolling_update": {"max_surge": "1", "max_unavailable": "25%"}
        }))
        .unwrap();

        let yaml = serde_yaml::to_string(&strategy).unwrap();
        assert_eq!(
            yaml,
            "type: RollingUpdate\nrollingUpdate:\n  maxSurge: 1\n  maxUnavailable: 25%\n"
        );
    }

    #[test]
    fn test_container_block() {
        let block = Container::block();
        assert!(block.attributes["name"].flags.required);
        assert!(block.blocks.contains_key("ports"));
        assert!(block.blocks.contains_key("security_context"));
        assert_eq!(
            block.description.as_deref(),
            Some("A single application container to run within a pod.")
        );
    }
}
