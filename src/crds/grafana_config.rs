//! The `spec.config` tree of the Grafana resource.
//!
//! Each section maps to a section of `grafana.ini`. Keys keep Grafana's own
//! snake_case names in the manifest; sections whose ini name contains a dot
//! (`auth.generic_oauth`, `log.console`) are configured with an underscore.

use crate::k8s::object::single;
use crate::k8s_object;
use crate::schema::Attribute;

fn secret() -> Attribute {
    Attribute::optional_string().sensitive()
}

fn org_role() -> Attribute {
    Attribute::optional_string().one_of(["Viewer", "Editor", "Admin"])
}

k8s_object! {
    /// Grafana configuration, rendered by the operator into `grafana.ini`.
    pub struct GrafanaConfig as "snake_case" {
        /// The `[paths]` section.
        paths: PathsConfig => single::<PathsConfig>(),
        /// The `[server]` section.
        server: ServerConfig => single::<ServerConfig>(),
        /// The `[database]` section.
        database: DatabaseConfig => single::<DatabaseConfig>(),
        /// The `[remote_cache]` section.
        remote_cache: RemoteCacheConfig => single::<RemoteCacheConfig>(),
        /// The `[security]` section.
        security: SecurityConfig => single::<SecurityConfig>(),
        /// The `[users]` section.
        users: UsersConfig => single::<UsersConfig>(),
        /// The `[auth]` section.
        auth: AuthConfig => single::<AuthConfig>(),
        /// The `[auth.basic]` section.
        #[yaml = "auth.basic"]
        auth_basic: AuthBasicConfig => single::<AuthBasicConfig>(),
        /// The `[auth.anonymous]` section.
        #[yaml = "auth.anonymous"]
        auth_anonymous: AuthAnonymousConfig => single::<AuthAnonymousConfig>(),
        /// The `[auth.azuread]` section.
        #[yaml = "auth.azuread"]
        auth_azuread: AuthOAuthConfig => single::<AuthOAuthConfig>(),
        /// The `[auth.google]` section.
        #[yaml = "auth.google"]
        auth_google: AuthOAuthConfig => single::<AuthOAuthConfig>(),
        /// The `[auth.github]` section.
        #[yaml = "auth.github"]
        auth_github: AuthGithubConfig => single::<AuthGithubConfig>(),
        /// The `[auth.gitlab]` section.
        #[yaml = "auth.gitlab"]
        auth_gitlab: AuthGitlabConfig => single::<AuthGitlabConfig>(),
        /// The `[auth.generic_oauth]` section.
        #[yaml = "auth.generic_oauth"]
        auth_generic_oauth: AuthGenericOAuthConfig => single::<AuthGenericOAuthConfig>(),
        /// The `[auth.ldap]` section.
        #[yaml = "auth.ldap"]
        auth_ldap: AuthLdapConfig => single::<AuthLdapConfig>(),
        /// The `[auth.proxy]` section.
        #[yaml = "auth.proxy"]
        auth_proxy: AuthProxyConfig => single::<AuthProxyConfig>(),
        /// The `[dataproxy]` section.
        dataproxy: DataProxyConfig => single::<DataProxyConfig>(),
        /// The `[analytics]` section.
        analytics: AnalyticsConfig => single::<AnalyticsConfig>(),
        /// The `[dashboards]` section.
        dashboards: DashboardsConfig => single::<DashboardsConfig>(),
        /// The `[smtp]` section.
        smtp: SmtpConfig => single::<SmtpConfig>(),
        /// The `[log]` section.
        log: LogConfig => single::<LogConfig>(),
        /// The `[log.console]` section.
        #[yaml = "log.console"]
        log_console: LogConsoleConfig => single::<LogConsoleConfig>(),
        /// The `[log.frontend]` section.
        #[yaml = "log.frontend"]
        log_frontend: LogFrontendConfig => single::<LogFrontendConfig>(),
        /// The `[metrics]` section.
        metrics: MetricsConfig => single::<MetricsConfig>(),
        /// The `[metrics.graphite]` section.
        #[yaml = "metrics.graphite"]
        metrics_graphite: MetricsGraphiteConfig => single::<MetricsGraphiteConfig>(),
        /// The `[snapshots]` section.
        snapshots: SnapshotsConfig => single::<SnapshotsConfig>(),
        /// The `[external_image_storage]` section.
        external_image_storage: ExternalImageStorageConfig => single::<ExternalImageStorageConfig>(),
        /// The `[external_image_storage.s3]` section.
        #[yaml = "external_image_storage.s3"]
        external_image_storage_s3: ExternalImageStorageS3Config => single::<ExternalImageStorageS3Config>(),
        /// The `[alerting]` section.
        alerting: AlertingConfig => single::<AlertingConfig>(),
        /// The `[unified_alerting]` section.
        unified_alerting: UnifiedAlertingConfig => single::<UnifiedAlertingConfig>(),
        /// The `[panels]` section.
        panels: PanelsConfig => single::<PanelsConfig>(),
        /// The `[plugins]` section.
        plugins: PluginsConfig => single::<PluginsConfig>(),
        /// The `[rendering]` section.
        rendering: RenderingConfig => single::<RenderingConfig>(),
        /// The `[live]` section.
        live: LiveConfig => single::<LiveConfig>(),
        /// The `[feature_toggles]` section.
        feature_toggles: FeatureTogglesConfig => single::<FeatureTogglesConfig>(),
        /// The `[date_formats]` section.
        date_formats: DateFormatsConfig => single::<DateFormatsConfig>(),
    }
}

k8s_object! {
    /// Filesystem locations used by Grafana.
    pub struct PathsConfig as "snake_case" {
        /// Path to where Grafana stores the sqlite3 database, file sessions and other data.
        data: String => Attribute::optional_string(),
        /// Directory where Grafana stores logs.
        logs: String => Attribute::optional_string(),
        /// Directory where Grafana automatically scans and looks for plugins.
        plugins: String => Attribute::optional_string(),
        /// Folder that contains provisioning config files.
        provisioning: String => Attribute::optional_string(),
        /// How long temporary images in the data directory should be kept.
        temp_data_lifetime: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// HTTP server settings.
    pub struct ServerConfig as "snake_case" {
        /// The IP address to bind to.
        http_addr: String => Attribute::optional_string(),
        /// The port to bind to.
        http_port: String => Attribute::optional_string(),
        /// Protocol served by Grafana.
        protocol: String => Attribute::optional_string().one_of(["http", "https", "h2", "socket"]),
        /// The public facing domain name used to access Grafana from a browser.
        domain: String => Attribute::optional_string(),
        /// Redirect to the correct domain if the host header does not match the domain.
        enforce_domain: bool => Attribute::optional_bool(),
        /// The full URL used to access Grafana from a web browser.
        root_url: String => Attribute::optional_string(),
        /// Serve Grafana from the subpath specified in `root_url`.
        serve_from_sub_path: bool => Attribute::optional_bool(),
        /// The path to the directory where the front end files are located.
        static_root_path: String => Attribute::optional_string(),
        /// Enable gzip compression of HTTP responses.
        enable_gzip: bool => Attribute::optional_bool(),
        /// Path to the certificate file when the protocol is https.
        cert_file: String => Attribute::optional_string(),
        /// Path to the certificate key file when the protocol is https.
        cert_key: String => Attribute::optional_string(),
        /// Log web requests.
        router_logging: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// Database connection settings.
    pub struct DatabaseConfig as "snake_case" {
        /// Database connection URL; overrides the other connection settings.
        url: String => secret(),
        /// Database type.
        #[yaml = "type"]
        db_type: String => Attribute::optional_string().one_of(["mysql", "postgres", "sqlite3"]),
        /// Database host and port.
        host: String => Attribute::optional_string(),
        /// Name of the Grafana database.
        name: String => Attribute::optional_string(),
        /// Database user.
        user: String => Attribute::optional_string(),
        /// Database user's password.
        password: String => secret(),
        /// TLS mode for postgres.
        ssl_mode: String => Attribute::optional_string(),
        /// Path to the CA certificate file.
        ca_cert_path: String => Attribute::optional_string(),
        /// Path to the client key file.
        client_key_path: String => Attribute::optional_string(),
        /// Path to the client certificate file.
        client_cert_path: String => Attribute::optional_string(),
        /// Common name field of the database server certificate.
        server_cert_name: String => Attribute::optional_string(),
        /// Path to the sqlite3 database file.
        path: String => Attribute::optional_string(),
        /// Maximum number of connections in the idle connection pool.
        max_idle_conn: i32 => Attribute::optional_int64(),
        /// Maximum number of open connections to the database.
        max_open_conn: i32 => Attribute::optional_int64(),
        /// Maximum amount of time in seconds a connection may be reused.
        conn_max_lifetime: i32 => Attribute::optional_int64(),
        /// Log the SQL statements issued to the database.
        log_queries: bool => Attribute::optional_bool(),
        /// Cache mode for sqlite3.
        cache_mode: String => Attribute::optional_string().one_of(["private", "shared"]),
    }
}

k8s_object! {
    /// Cache used for sessions and short lived data.
    pub struct RemoteCacheConfig as "snake_case" {
        /// Cache backend.
        #[yaml = "type"]
        cache_type: String => Attribute::optional_string().one_of(["redis", "memcached", "database"]),
        /// Connection string for the cache backend.
        connstr: String => secret(),
    }
}

k8s_object! {
    /// Security settings.
    pub struct SecurityConfig as "snake_case" {
        /// Name of the default Grafana admin user.
        admin_user: String => Attribute::optional_string(),
        /// Password of the default Grafana admin user.
        admin_password: String => secret(),
        /// Number of days the keep me logged in / remember me cookie lasts.
        login_remember_days: i32 => Attribute::optional_int64(),
        /// Used for signing some data source settings.
        secret_key: String => secret(),
        /// Disable usage of Gravatar for user profile images.
        disable_gravatar: bool => Attribute::optional_bool(),
        /// Whitelist of hosts the data source proxy may send requests to.
        data_source_proxy_whitelist: String => Attribute::optional_string(),
        /// Set to true when hosting Grafana behind HTTPS.
        cookie_secure: bool => Attribute::optional_bool(),
        /// The SameSite cookie attribute.
        cookie_samesite: String => Attribute::optional_string().one_of(["lax", "strict", "none", "disabled"]),
        /// Allow browsers to render Grafana in a frame.
        allow_embedding: bool => Attribute::optional_bool(),
        /// Send the Strict-Transport-Security header.
        strict_transport_security: bool => Attribute::optional_bool(),
        /// Max age of the Strict-Transport-Security header.
        strict_transport_security_max_age_seconds: i32 => Attribute::optional_int64(),
        /// Send the X-Content-Type-Options response header.
        x_content_type_options: bool => Attribute::optional_bool(),
        /// Send the X-XSS-Protection header.
        x_xss_protection: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// User management settings.
    pub struct UsersConfig as "snake_case" {
        /// Allow users to sign up and create user accounts.
        allow_sign_up: bool => Attribute::optional_bool(),
        /// Allow non admin users to create organizations.
        allow_org_create: bool => Attribute::optional_bool(),
        /// Add new users to the main organization.
        auto_assign_org: bool => Attribute::optional_bool(),
        /// Organization new users are added to.
        auto_assign_org_id: String => Attribute::optional_string(),
        /// Role new users are assigned for the main organization.
        auto_assign_org_role: String => org_role(),
        /// Viewers can edit and inspect dashboard settings in the browser.
        viewers_can_edit: bool => Attribute::optional_bool(),
        /// Editors can administrate dashboards, folders and teams they create.
        editors_can_admin: bool => Attribute::optional_bool(),
        /// Text used as placeholder text on login page for the login input.
        login_hint: String => Attribute::optional_string(),
        /// Text used as placeholder text on login page for the password input.
        password_hint: String => Attribute::optional_string(),
        /// Default UI theme.
        default_theme: String => Attribute::optional_string().one_of(["dark", "light"]),
    }
}

k8s_object! {
    /// Authentication settings shared by every auth provider.
    pub struct AuthConfig as "snake_case" {
        /// Name of the login cookie.
        login_cookie_name: String => Attribute::optional_string(),
        /// Maximum inactive duration before a user has to log in again.
        login_maximum_inactive_lifetime_days: i32 => Attribute::optional_int64(),
        /// Maximum lifetime before a user has to log in again.
        login_maximum_lifetime_days: i32 => Attribute::optional_int64(),
        /// How often auth tokens are rotated.
        token_rotation_interval_minutes: i32 => Attribute::optional_int64(),
        /// Hide the login form.
        disable_login_form: bool => Attribute::optional_bool(),
        /// Hide the sign out menu link.
        disable_signout_menu: bool => Attribute::optional_bool(),
        /// Enable AWS SigV4 authentication for data sources.
        sigv4_auth_enabled: bool => Attribute::optional_bool(),
        /// URL to redirect the user to after sign out.
        signout_redirect_url: String => Attribute::optional_string(),
        /// Attempt OAuth login automatically, skipping the login screen.
        oauth_auto_login: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// Basic authentication.
    pub struct AuthBasicConfig as "snake_case" {
        /// Enable basic authentication.
        enabled: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// Anonymous access.
    pub struct AuthAnonymousConfig as "snake_case" {
        /// Enable anonymous access.
        enabled: bool => Attribute::optional_bool(),
        /// Organization used for anonymous users.
        org_name: String => Attribute::optional_string(),
        /// Role of anonymous users.
        org_role: String => org_role(),
    }
}

k8s_object! {
    /// An OAuth2 identity provider.
    pub struct AuthOAuthConfig as "snake_case" {
        /// Enable this provider.
        enabled: bool => Attribute::optional_bool(),
        /// Create Grafana users for new logins.
        allow_sign_up: bool => Attribute::optional_bool(),
        /// OAuth client id.
        client_id: String => Attribute::optional_string(),
        /// OAuth client secret.
        client_secret: String => secret(),
        /// Requested OAuth scopes.
        scopes: String => Attribute::optional_string(),
        /// Authorization endpoint.
        auth_url: String => Attribute::optional_string(),
        /// Token endpoint.
        token_url: String => Attribute::optional_string(),
        /// Email domains allowed to log in.
        allowed_domains: String => Attribute::optional_string(),
        /// Groups allowed to log in.
        allowed_groups: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// GitHub OAuth.
    pub struct AuthGithubConfig as "snake_case" {
        /// Enable GitHub login.
        enabled: bool => Attribute::optional_bool(),
        /// Create Grafana users for new logins.
        allow_sign_up: bool => Attribute::optional_bool(),
        /// OAuth client id.
        client_id: String => Attribute::optional_string(),
        /// OAuth client secret.
        client_secret: String => secret(),
        /// Requested OAuth scopes.
        scopes: String => Attribute::optional_string(),
        /// Authorization endpoint.
        auth_url: String => Attribute::optional_string(),
        /// Token endpoint.
        token_url: String => Attribute::optional_string(),
        /// GitHub API endpoint.
        api_url: String => Attribute::optional_string(),
        /// Team ids whose members may log in.
        team_ids: String => Attribute::optional_string(),
        /// Organizations whose members may log in.
        allowed_organizations: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// GitLab OAuth.
    pub struct AuthGitlabConfig as "snake_case" {
        /// Enable GitLab login.
        enabled: bool => Attribute::optional_bool(),
        /// Create Grafana users for new logins.
        allow_sign_up: bool => Attribute::optional_bool(),
        /// OAuth client id.
        client_id: String => Attribute::optional_string(),
        /// OAuth client secret.
        client_secret: String => secret(),
        /// Requested OAuth scopes.
        scopes: String => Attribute::optional_string(),
        /// Authorization endpoint.
        auth_url: String => Attribute::optional_string(),
        /// Token endpoint.
        token_url: String => Attribute::optional_string(),
        /// GitLab API endpoint.
        api_url: String => Attribute::optional_string(),
        /// Groups whose members may log in.
        allowed_groups: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// Generic OAuth2 identity provider.
    pub struct AuthGenericOAuthConfig as "snake_case" {
        /// Enable generic OAuth login.
        enabled: bool => Attribute::optional_bool(),
        /// Name shown on the login button.
        name: String => Attribute::optional_string(),
        /// Create Grafana users for new logins.
        allow_sign_up: bool => Attribute::optional_bool(),
        /// OAuth client id.
        client_id: String => Attribute::optional_string(),
        /// OAuth client secret.
        client_secret: String => secret(),
        /// Requested OAuth scopes.
        scopes: String => Attribute::optional_string(),
        /// Authorization endpoint.
        auth_url: String => Attribute::optional_string(),
        /// Token endpoint.
        token_url: String => Attribute::optional_string(),
        /// User info endpoint.
        api_url: String => Attribute::optional_string(),
        /// Email domains allowed to log in.
        allowed_domains: String => Attribute::optional_string(),
        /// JMESPath expression mapping the user info to a Grafana role.
        role_attribute_path: String => Attribute::optional_string(),
        /// JMESPath expression extracting the user's email.
        email_attribute_path: String => Attribute::optional_string(),
        /// Skip TLS verification of the identity provider.
        tls_skip_verify_insecure: bool => Attribute::optional_bool(),
        /// Path to the client certificate.
        tls_client_cert: String => Attribute::optional_string(),
        /// Path to the client key.
        tls_client_key: String => Attribute::optional_string(),
        /// Path to the trusted certificate authority list.
        tls_client_ca: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// LDAP authentication.
    pub struct AuthLdapConfig as "snake_case" {
        /// Enable LDAP login.
        enabled: bool => Attribute::optional_bool(),
        /// Create Grafana users for new logins.
        allow_sign_up: bool => Attribute::optional_bool(),
        /// Path to the LDAP configuration file.
        config_file: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// Authentication by a reverse proxy.
    pub struct AuthProxyConfig as "snake_case" {
        /// Enable proxy authentication.
        enabled: bool => Attribute::optional_bool(),
        /// HTTP header carrying the user name.
        header_name: String => Attribute::optional_string(),
        /// What the header value contains.
        header_property: String => Attribute::optional_string().one_of(["username", "email"]),
        /// Create users that do not exist yet.
        auto_sign_up: bool => Attribute::optional_bool(),
        /// Minutes between LDAP syncs of proxied users.
        ldap_sync_ttl: i32 => Attribute::optional_int64(),
        /// Addresses the proxy may connect from.
        whitelist: String => Attribute::optional_string(),
        /// Additional headers mapped to user attributes.
        headers: String => Attribute::optional_string(),
        /// Issue a login token after proxy authentication.
        enable_login_token: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// Data source proxy settings.
    pub struct DataProxyConfig as "snake_case" {
        /// Log data proxy requests.
        logging: bool => Attribute::optional_bool(),
        /// Seconds to wait for a data source response.
        timeout: i32 => Attribute::optional_int64(),
        /// Forward the user name in the X-Grafana-User header.
        send_user_header: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// Usage analytics.
    pub struct AnalyticsConfig as "snake_case" {
        /// Send anonymous usage statistics to stats.grafana.org.
        reporting_enabled: bool => Attribute::optional_bool(),
        /// Google Analytics universal tracking code.
        google_analytics_ua_id: String => Attribute::optional_string(),
        /// Check grafana.com for new versions.
        check_for_updates: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// Dashboard settings.
    pub struct DashboardsConfig as "snake_case" {
        /// Number of dashboard versions to keep per dashboard.
        versions_to_keep: i32 => Attribute::optional_int64(),
        /// Path to the default home dashboard.
        default_home_dashboard_path: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// Email server settings.
    pub struct SmtpConfig as "snake_case" {
        /// Enable sending email.
        enabled: bool => Attribute::optional_bool(),
        /// SMTP host and port.
        host: String => Attribute::optional_string(),
        /// SMTP user.
        user: String => Attribute::optional_string(),
        /// SMTP password.
        password: String => secret(),
        /// Path to the certificate file.
        cert_file: String => Attribute::optional_string(),
        /// Path to the key file.
        key_file: String => Attribute::optional_string(),
        /// Skip TLS verification of the SMTP server.
        skip_verify: bool => Attribute::optional_bool(),
        /// Address used when sending out emails.
        from_address: String => Attribute::optional_string(),
        /// Name used when sending out emails.
        from_name: String => Attribute::optional_string(),
        /// Name used as client identity for the EHLO command.
        ehlo_identity: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// Logging settings.
    pub struct LogConfig as "snake_case" {
        /// Log outputs, separated by spaces.
        mode: String => Attribute::optional_string(),
        /// Log level.
        level: String => Attribute::optional_string().one_of(["debug", "info", "warn", "error", "critical"]),
        /// Per-logger level overrides.
        filters: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// Console log output.
    pub struct LogConsoleConfig as "snake_case" {
        /// Log level of the console output.
        level: String => Attribute::optional_string().one_of(["debug", "info", "warn", "error", "critical"]),
        /// Log line format.
        format: String => Attribute::optional_string().one_of(["text", "console", "json"]),
    }
}

k8s_object! {
    /// Frontend error logging.
    pub struct LogFrontendConfig as "snake_case" {
        /// Enable frontend error logging.
        enabled: bool => Attribute::optional_bool(),
        /// Sentry DSN to send errors to.
        sentry_dsn: String => Attribute::optional_string(),
        /// Custom endpoint errors are sent to.
        custom_endpoint: String => Attribute::optional_string(),
        /// Rate of events to be reported between 0 (none) and 1 (all).
        sample_rate: f64 => Attribute::optional_float64(),
    }
}

k8s_object! {
    /// Internal metrics.
    pub struct MetricsConfig as "snake_case" {
        /// Enable the metrics endpoint.
        enabled: bool => Attribute::optional_bool(),
        /// Basic auth user for the metrics endpoint.
        basic_auth_username: String => Attribute::optional_string(),
        /// Basic auth password for the metrics endpoint.
        basic_auth_password: String => secret(),
        /// Flush interval in seconds.
        interval_seconds: i32 => Attribute::optional_int64(),
    }
}

k8s_object! {
    /// Graphite metrics export.
    pub struct MetricsGraphiteConfig as "snake_case" {
        /// Graphite host and port.
        address: String => Attribute::optional_string(),
        /// Metric name prefix.
        prefix: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// Dashboard snapshot settings.
    pub struct SnapshotsConfig as "snake_case" {
        /// Enable external snapshot publishing.
        external_enabled: bool => Attribute::optional_bool(),
        /// URL of the external snapshot server.
        external_snapshot_url: String => Attribute::optional_string(),
        /// Name of the external snapshot server.
        external_snapshot_name: String => Attribute::optional_string(),
        /// Remove expired snapshots.
        snapshot_remove_expired: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// Where rendered images for alert notifications are uploaded.
    pub struct ExternalImageStorageConfig as "snake_case" {
        /// Storage provider.
        provider: String => Attribute::optional_string().one_of(["s3", "webdav", "gcs", "azure_blob", "local"]),
    }
}

k8s_object! {
    /// Amazon S3 image storage.
    pub struct ExternalImageStorageS3Config as "snake_case" {
        /// Bucket name.
        bucket: String => Attribute::optional_string(),
        /// Bucket region.
        region: String => Attribute::optional_string(),
        /// Optional path prefix inside the bucket.
        path: String => Attribute::optional_string(),
        /// Access key.
        access_key: String => Attribute::optional_string(),
        /// Secret key.
        secret_key: String => secret(),
    }
}

k8s_object! {
    /// Legacy alerting.
    pub struct AlertingConfig as "snake_case" {
        /// Enable the alerting engine.
        enabled: bool => Attribute::optional_bool(),
        /// Execute alert rules.
        execute_alerts: bool => Attribute::optional_bool(),
        /// State of alerts whose evaluation fails or times out.
        error_or_timeout: String => Attribute::optional_string().one_of(["alerting", "keep_state"]),
        /// State of alerts whose query returns no data.
        nodata_or_nullvalues: String => Attribute::optional_string().one_of(["alerting", "no_data", "keep_state", "ok"]),
        /// Maximum number of concurrent image renders.
        concurrent_render_limit: i32 => Attribute::optional_int64(),
        /// Alert evaluation timeout in seconds.
        evaluation_timeout_seconds: i32 => Attribute::optional_int64(),
        /// Notification timeout in seconds.
        notification_timeout_seconds: i32 => Attribute::optional_int64(),
        /// Attempts to send a notification.
        max_attempts: i32 => Attribute::optional_int64(),
    }
}

k8s_object! {
    /// Grafana 8 alerting.
    pub struct UnifiedAlertingConfig as "snake_case" {
        /// Enable unified alerting.
        enabled: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// Panel settings.
    pub struct PanelsConfig as "snake_case" {
        /// Disable HTML sanitisation in text panels.
        disable_sanitize_html: bool => Attribute::optional_bool(),
    }
}

k8s_object! {
    /// Plugin settings.
    pub struct PluginsConfig as "snake_case" {
        /// Enable plugins marked as alpha.
        enable_alpha: bool => Attribute::optional_bool(),
        /// Comma separated plugin ids that may be loaded unsigned.
        allow_loading_unsigned_plugins: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// Remote image rendering.
    pub struct RenderingConfig as "snake_case" {
        /// URL of the remote rendering service.
        server_url: String => Attribute::optional_string(),
        /// URL the rendering service calls back to.
        callback_url: String => Attribute::optional_string(),
        /// Maximum number of concurrent render requests.
        concurrent_render_request_limit: i32 => Attribute::optional_int64(),
    }
}

k8s_object! {
    /// Grafana Live.
    pub struct LiveConfig as "snake_case" {
        /// Maximum number of WebSocket connections.
        max_connections: i32 => Attribute::optional_int64(),
        /// Origins allowed to open WebSocket connections.
        allowed_origins: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// Feature toggles.
    pub struct FeatureTogglesConfig as "snake_case" {
        /// Space separated list of features to enable.
        enable: String => Attribute::optional_string(),
    }
}

k8s_object! {
    /// Date formats used in graphs and tables.
    pub struct DateFormatsConfig as "snake_case" {
        /// Format of full dates.
        full_date: String => Attribute::optional_string(),
        /// Format of intervals shorter than a minute.
        interval_second: String => Attribute::optional_string(),
        /// Format of intervals shorter than an hour.
        interval_minute: String => Attribute::optional_string(),
        /// Format of intervals shorter than a day.
        interval_hour: String => Attribute::optional_string(),
        /// Format of intervals shorter than a month.
        interval_day: String => Attribute::optional_string(),
        /// Format of intervals shorter than a year.
        interval_month: String => Attribute::optional_string(),
        /// Format of intervals of a year or more.
        interval_year: String => Attribute::optional_string(),
        /// Use the browser's locale for date formats.
        use_browser_locale: bool => Attribute::optional_bool(),
        /// Default time zone of new users.
        default_timezone: String => Attribute::optional_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::object::ObjectSchema;
    use serde_json::json;

    #[test]
    fn test_dotted_sections() {
        let config: GrafanaConfig = serde_json::from_value(json!({
            "auth_generic_oauth": {"enabled": true, "client_id": "grafana"},
            "log_console": {"format": "json"},
            "server": {"root_url": "grafana.example.com"}
        }))
        .unwrap();

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert_eq!(
            yaml,
            "server:\n  root_url: grafana.example.com\n\
             auth.generic_oauth:\n  enabled: true\n  client_id: grafana\n\
             log.console:\n  format: json\n"
        );
    }

    #[test]
    fn test_dotted_section_names_are_not_accepted_in_config() {
        let result = serde_json::from_value::<GrafanaConfig>(json!({
            "auth.generic_oauth": {"enabled": true}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_type_keys() {
        let database: DatabaseConfig = serde_json::from_value(json!({
            "db_type": "postgres",
            "host": "db"
        }))
        .unwrap();
        assert_eq!(
            serde_yaml::to_string(&database).unwrap(),
            "type: postgres\nhost: db\n"
        );
    }

    #[test]
    fn test_secrets_are_sensitive() {
        let block = GrafanaConfig::block();
        let security = &block.blocks["security"].block;
        assert!(security.attributes["admin_password"].flags.sensitive);
        assert!(!security.attributes["admin_user"].flags.sensitive);
        assert!(block.blocks["auth_google"].block.attributes["client_secret"].flags.sensitive);
    }
}
