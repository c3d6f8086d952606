//! `Grafana` from `integreatly.org/v1alpha1`, as managed by grafana-operator.

use std::collections::BTreeMap;

use crate::crds::grafana_config::GrafanaConfig;
use crate::k8s::core::{
    Affinity, Container, DeploymentStrategy, EnvFromSource, EnvVar, LabelSelector,
    LocalObjectReference, PodSecurityContext, ResourceRequirements, SecurityContext, ServicePort,
    Toleration, Volume, VolumeMount,
};
use crate::k8s::object::{list, single, ObjectSchema};
use crate::k8s_object;
use crate::resource::CustomResource;
use crate::schema::{Attribute, Block};

/// The Grafana custom resource kind.
pub struct Grafana;

impl CustomResource for Grafana {
    const GROUP: &'static str = "integreatly.org";
    const VERSION: &'static str = "v1alpha1";
    const KIND: &'static str = "Grafana";
    const NAMESPACED: bool = true;

    type Spec = GrafanaSpec;

    fn description() -> &'static str {
        "Grafana is the Schema for the grafanas API"
    }

    fn spec_block() -> Block {
        GrafanaSpec::block()
    }
}

fn string_map() -> Attribute {
    Attribute::optional_string_map()
}

k8s_object! {
    /// GrafanaSpec defines the desired state of Grafana.
    pub struct GrafanaSpec as "camelCase" {
        /// Image used for the Grafana container; overrides the operator default.
        base_image: String => Attribute::optional_string(),
        /// Image used for the plugin installation init container.
        init_image: String => Attribute::optional_string(),
        /// How the operator talks to the Grafana API.
        client: GrafanaClient => single::<GrafanaClient>(),
        /// Grafana configuration, rendered into `grafana.ini`.
        config: GrafanaConfig => single::<GrafanaConfig>(),
        /// ConfigMaps mounted into the Grafana container under `/etc/grafana-configmaps`.
        config_maps: Vec<String> => Attribute::optional_string_list(),
        /// Secrets mounted into the Grafana container under `/etc/grafana-secrets`.
        secrets: Vec<String> => Attribute::optional_string_list(),
        /// Extra containers added to the Grafana pod.
        containers: Vec<Container> => list::<Container>(),
        /// Extra init containers added to the Grafana pod.
        init_containers: Vec<Container> => list::<Container>(),
        /// Label selectors matching the GrafanaDashboards this instance discovers.
        dashboard_label_selector: Vec<LabelSelector> => list::<LabelSelector>(),
        /// Selects the namespaces dashboards are discovered in.
        dashboard_namespace_selector: LabelSelector => single::<LabelSelector>(),
        /// Persistent storage for Grafana's data directory.
        data_storage: GrafanaDataStorage => single::<GrafanaDataStorage>(),
        /// Settings of the Grafana deployment.
        deployment: GrafanaDeployment => single::<GrafanaDeployment>(),
        /// Ingress exposing Grafana.
        ingress: GrafanaIngress => single::<GrafanaIngress>(),
        /// Jsonnet library discovery.
        jsonnet: JsonnetConfig => single::<JsonnetConfig>(),
        /// Liveness probe of the Grafana container.
        liveness_probe_spec: LivenessProbeSpec => single::<LivenessProbeSpec>(),
        /// Readiness probe of the Grafana container.
        readiness_probe_spec: ReadinessProbeSpec => single::<ReadinessProbeSpec>(),
        /// Compute resources of the Grafana container.
        resources: ResourceRequirements => single::<ResourceRequirements>(),
        /// Service exposing Grafana.
        service: GrafanaService => single::<GrafanaService>(),
        /// Service account the Grafana pod runs as.
        service_account: GrafanaServiceAccount => single::<GrafanaServiceAccount>(),
    }
}

k8s_object! {
    /// Operator client settings.
    pub struct GrafanaClient as "camelCase" {
        /// Request timeout in seconds.
        timeout: i32 => Attribute::optional_int64(),
        /// Use the service address instead of the ingress or route.
        prefer_service: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// Persistent volume claim for Grafana's data.
    pub struct GrafanaDataStorage as "camelCase" {
        /// Annotations of the claim.
        annotations: BTreeMap<String, String> => string_map(),
        /// Labels of the claim.
        labels: BTreeMap<String, String> => string_map(),
        /// Access modes of the claim.
        access_modes: Vec<String> => Attribute::optional_string_list(),
        /// Requested size, for example `10Gi`.
        size: String => Attribute::optional_string(),
        /// Storage class of the claim.
        class: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// Settings of the Grafana deployment.
    pub struct GrafanaDeployment as "camelCase" {
        /// Annotations of the deployment.
        annotations: BTreeMap<String, String> => string_map(),
        /// Labels of the deployment.
        labels: BTreeMap<String, String> => string_map(),
        /// Number of Grafana replicas.
        replicas: i32 => Attribute::optional_int64(),
        /// Node labels the pod must be scheduled on.
        node_selector: BTreeMap<String, String> => string_map(),
        /// Tolerations of the pod.
        tolerations: Vec<Toleration> => list::<Toleration>(),
        /// Scheduling constraints of the pod.
        affinity: Affinity => single::<Affinity>(),
        /// Pod-level security attributes.
        security_context: PodSecurityContext => single::<PodSecurityContext>(),
        /// Security options of the Grafana container.
        container_security_context: SecurityContext => single::<SecurityContext>(),
        /// Seconds the pod needs to terminate gracefully.
        termination_grace_period_seconds: i64 => Attribute::optional_int64(),
        /// Environment variables of the Grafana container.
        env: Vec<EnvVar> => list::<EnvVar>(),
        /// Sources of environment variables of the Grafana container.
        env_from: Vec<EnvFromSource> => list::<EnvFromSource>(),
        /// Do not create the admin account secret.
        skip_create_admin_account: bool => Attribute::optional_bool(),
        /// Priority class of the pod.
        priority_class_name: String => Attribute::optional_string(),
        /// Use the host's network namespace.
        host_network: bool => Attribute::optional_bool(),
        /// Extra volumes of the pod.
        extra_volumes: Vec<Volume> => list::<Volume>(),
        /// Extra volume mounts of the Grafana container.
        extra_volume_mounts: Vec<VolumeMount> => list::<VolumeMount>(),
        /// Deployment strategy.
        strategy: DeploymentStrategy => single::<DeploymentStrategy>(),
        /// HTTP proxy used by Grafana.
        http_proxy: GrafanaHttpProxy => single::<GrafanaHttpProxy>(),
    }
}

k8s_object! {
    /// HTTP proxy settings of the Grafana container.
    pub struct GrafanaHttpProxy as "camelCase" {
        /// Route Grafana's outbound traffic through the proxy.
        enabled: bool => Attribute::optional_bool(),
        /// Proxy URL.
        #[yaml = "URL"]
        url: String => Attribute::optional_string(),
        /// Secure proxy URL.
        #[yaml = "secureURL"]
        secure_url: String => Attribute::optional_string(),
        /// Hosts that bypass the proxy.
        no_proxy: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// Ingress exposing Grafana.
    pub struct GrafanaIngress as "camelCase" {
        /// Annotations of the ingress.
        annotations: BTreeMap<String, String> => string_map(),
        /// Create the ingress.
        enabled: bool => Attribute::optional_bool(),
        /// Host name the ingress is served on.
        hostname: String => Attribute::optional_string(),
        /// Labels of the ingress.
        labels: BTreeMap<String, String> => string_map(),
        /// Path of the ingress rule.
        path: String => Attribute::optional_string(),
        /// How the path is matched.
        path_type: String => Attribute::optional_string().one_of(["Exact", "Prefix", "ImplementationSpecific"]),
        /// Terminate TLS at the ingress.
        tls_enabled: bool => Attribute::optional_bool(),
        /// Secret holding the TLS certificate.
        tls_secret_name: String => Attribute::optional_string(),
        /// Service port the ingress routes to.
        target_port: String => Attribute::optional_string(),
        /// TLS termination of an OpenShift route.
        termination: String => Attribute::optional_string().one_of(["edge", "reencrypt", "passthrough"]),
        /// Ingress class handling the ingress.
        ingress_class_name: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// Service exposing Grafana.
    pub struct GrafanaService as "camelCase" {
        /// Name of the service.
        name: String => Attribute::optional_string(),
        /// Annotations of the service.
        annotations: BTreeMap<String, String> => string_map(),
        /// Labels of the service.
        labels: BTreeMap<String, String> => string_map(),
        /// Type of the service.
        #[yaml = "type"]
        service_type: String => Attribute::optional_string().one_of(["ClusterIP", "NodePort", "LoadBalancer", "ExternalName"]),
        /// Additional ports of the service.
        ports: Vec<ServicePort> => list::<ServicePort>(),
        /// Cluster IP of the service.
        #[yaml = "clusterIP"]
        cluster_ip: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// Service account the Grafana pod runs as.
    pub struct GrafanaServiceAccount as "camelCase" {
        /// Use an existing service account instead of creating one.
        skip: bool => Attribute::optional_bool(),
        /// Annotations of the service account.
        annotations: BTreeMap<String, String> => string_map(),
        /// Labels of the service account.
        labels: BTreeMap<String, String> => string_map(),
        /// Secrets used to pull images.
        image_pull_secrets: Vec<LocalObjectReference> => list::<LocalObjectReference>(),
    }
}

k8s_object! {
    /// Jsonnet library discovery.
    pub struct JsonnetConfig as "camelCase" {
        /// Selects the ConfigMaps holding jsonnet libraries.
        library_label_selector: LabelSelector => single::<LabelSelector>(),
    }
}

k8s_object! {
    /// Liveness probe settings of the Grafana container.
    pub struct LivenessProbeSpec as "camelCase" {
        /// Seconds after the container has started before the probe is initiated.
        initial_delay_seconds: i32 => Attribute::optional_int64(),
        /// Seconds after which the probe times out.
        time_out_seconds: i32 => Attribute::optional_int64(),
        /// How often (in seconds) to perform the probe.
        period_seconds: i32 => Attribute::optional_int64(),
        /// Minimum consecutive successes for the probe to be considered successful.
        success_threshold: i32 => Attribute::optional_int64(),
        /// Minimum consecutive failures for the probe to be considered failed.
        failure_threshold: i32 => Attribute::optional_int64(),
        /// Scheme used to probe the container.
        scheme: String => Attribute::optional_string().one_of(["HTTP", "HTTPS"]),
    }
}

k8s_object! {
    /// Readiness probe settings of the Grafana container.
    pub struct ReadinessProbeSpec as "camelCase" {
        /// Seconds after the container has started before the probe is initiated.
        initial_delay_seconds: i32 => Attribute::optional_int64(),
        /// Seconds after which the probe times out.
        time_out_seconds: i32 => Attribute::optional_int64(),
        /// How often (in seconds) to perform the probe.
        period_seconds: i32 => Attribute::optional_int64(),
        /// Minimum consecutive successes for the probe to be considered successful.
        success_threshold: i32 => Attribute::optional_int64(),
        /// Minimum consecutive failures for the probe to be considered failed.
        failure_threshold: i32 => Attribute::optional_int64(),
        /// Scheme used to probe the container.
        scheme: String => Attribute::optional_string().one_of(["HTTP", "HTTPS"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity() {
        assert_eq!(Grafana::api_version(), "integreatly.org/v1alpha1");
        assert_eq!(Grafana::resource_type(), "k8s_integreatly_org_grafana_v1alpha1");
    }

    #[test]
    fn test_spec_yaml() {
        let spec: GrafanaSpec = serde_json::from_value(json!({
            "base_image": "grafana/grafana:9.5.2",
            "client": {"prefer_service": true},
            "ingress": {"enabled": true, "hostname": "grafana.example.com", "target_port": "3000"},
            "service": {"service_type": "ClusterIP", "cluster_ip": "None"},
            "dashboard_label_selector": [{"match_labels": {"app": "grafana"}}]
        }))
        .unwrap();

        let yaml = serde_yaml::to_string(&spec).unwrap();
        assert_eq!(
            yaml,
            "baseImage: grafana/grafana:9.5.2\n\
             client:\n  preferService: true\n\
             dashboardLabelSelector:\n- matchLabels:\n    app: grafana\n\
             ingress:\n  enabled: true\n  hostname: grafana.example.com\n  targetPort: '3000'\n\
             service:\n  type: ClusterIP\n  clusterIP: None\n"
        );
    }

    #[test]
    fn test_ingress_target_port_is_a_string() {
        let spec: GrafanaSpec =
            serde_json::from_value(json!({"ingress": {"target_port": "3000"}})).unwrap();
        let doc: serde_yaml::Value =
            serde_yaml::from_str(&serde_yaml::to_string(&spec).unwrap()).unwrap();
        assert_eq!(doc["ingress"]["targetPort"], serde_yaml::Value::from("3000"));

        assert!(serde_json::from_value::<GrafanaSpec>(json!({"ingress": {"target_port": 3000}})).is_err());
    }

    #[test]
    fn test_empty_lists_are_kept() {
        let spec: GrafanaSpec = serde_json::from_value(json!({"secrets": []})).unwrap();
        assert_eq!(serde_yaml::to_string(&spec).unwrap(), "secrets: []\n");
    }

    #[test]
    fn test_schema_shape() {
        let block = Grafana::spec_block();
        assert!(block.attributes.contains_key("base_image"));
        assert!(block.blocks.contains_key("config"));
        assert!(block.blocks["deployment"].block.blocks.contains_key("tolerations"));
        assert_eq!(
            block.blocks["client"].block.description.as_deref(),
            Some("How the operator talks to the Grafana API.")
        );
    }
}
