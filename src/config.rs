use std::fmt;
use std::fmt::Write as _;

/// ODBC driver named in generated connection strings unless overridden.
pub const DEFAULT_ODBC_DRIVER: &str = "ODBC Driver 18 for SQL Server";

/// Default SQL Server TCP port.
pub const DEFAULT_PORT: u16 = 1433;

/// How connection-string field values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldEscaping {
    /// Wrap values containing delimiters in braces and double any `}`.
    #[default]
    Quoted,
    /// Concatenate values as given. A value containing `;` can inject extra
    /// attributes, so only use this with trusted input.
    Verbatim,
}

/// Options for opening a SQL Server connection.
///
/// The fields mirror what the host passes to `connect`: all of them are opaque text,
/// including the timeout.
#[derive(Clone)]
pub struct ConnectOptions {
    pub server: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub timeout_seconds: String,
    pub driver_name: String,
    pub trust_server_certificate: bool,
    pub escaping: FieldEscaping,
    pub reconnect: bool,
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("driver_name", &self.driver_name)
            .field("trust_server_certificate", &self.trust_server_certificate)
            .field("escaping", &self.escaping)
            .field("reconnect", &self.reconnect)
            .finish_non_exhaustive()
    }
}

impl ConnectOptions {
    #[must_use]
    pub fn new(
        server: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        timeout_seconds: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            database: database.into(),
            user: user.into(),
            password: password.into(),
            timeout_seconds: timeout_seconds.into(),
            driver_name: DEFAULT_ODBC_DRIVER.to_string(),
            trust_server_certificate: true,
            escaping: FieldEscaping::default(),
            reconnect: false,
        }
    }

    #[must_use]
    pub fn builder(
        server: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> ConnectOptionsBuilder {
        ConnectOptionsBuilder::new(server, database, user, password)
    }

    #[must_use]
    pub fn with_escaping(mut self, escaping: FieldEscaping) -> Self {
        self.escaping = escaping;
        self
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Login timeout, when the timeout text is a whole number of seconds.
    #[must_use]
    pub fn login_timeout(&self) -> Option<u32> {
        self.timeout_seconds.trim().parse().ok()
    }

    /// Build the ODBC connection string for these options.
    #[must_use]
    pub fn odbc_connection_string(&self) -> String {
        let mut out = String::with_capacity(128);
        // The driver name is always braced, as ODBC requires for names with spaces.
        let _ = write!(out, "Driver={{{}}};", self.driver_name.replace('}', "}}"));
        self.push_attribute(&mut out, "Server", &self.server);
        self.push_attribute(&mut out, "Database", &self.database);
        self.push_attribute(&mut out, "UID", &self.user);
        self.push_attribute(&mut out, "PWD", &self.password);
        let trust = if self.trust_server_certificate { "yes" } else { "no" };
        let _ = write!(out, "TrustServerCertificate={trust};");
        self.push_attribute(&mut out, "Connection Timeout", &self.timeout_seconds);
        out
    }

    fn push_attribute(&self, out: &mut String, key: &str, value: &str) {
        out.push_str(key);
        out.push('=');
        match self.escaping {
            FieldEscaping::Quoted => out.push_str(&quote_attribute_value(value)),
            FieldEscaping::Verbatim => out.push_str(value),
        }
        out.push(';');
    }

    /// Split the server text into host, port and instance name.
    ///
    /// Accepts the forms SQL Server clients understand: `host`, `host,port`,
    /// `host\instance` and an optional `tcp:` prefix.
    #[must_use]
    pub fn server_address(&self) -> ServerAddress {
        ServerAddress::parse(&self.server)
    }
}

/// Host part of [`ConnectOptions::server`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: Option<u16>,
    pub instance_name: Option<String>,
}

impl ServerAddress {
    #[must_use]
    pub fn parse(server: &str) -> Self {
        let trimmed = server.trim();
        let trimmed = trimmed.strip_prefix("tcp:").unwrap_or(trimmed);

        let (rest, port) = match trimmed.rsplit_once(',') {
            Some((rest, port)) => match port.trim().parse::<u16>() {
                Ok(port) => (rest, Some(port)),
                Err(_) => (trimmed, None),
            },
            None => (trimmed, None),
        };

        let (host, instance_name) = match rest.split_once('\\') {
            Some((host, instance)) if !instance.is_empty() => {
                (host, Some(instance.to_string()))
            }
            _ => (rest, None),
        };

        let host = match host {
            "" | "." | "(local)" => "localhost",
            other => other,
        };

        ServerAddress {
            host: host.to_string(),
            port,
            instance_name,
        }
    }
}

/// Quote a connection-string value if it contains characters with syntactic meaning.
#[must_use]
pub fn quote_attribute_value(value: &str) -> String {
    let needs_quoting = value.contains([';', '{', '}', '='])
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);
    if needs_quoting {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}

/// Fluent builder for [`ConnectOptions`].
#[derive(Debug, Clone)]
pub struct ConnectOptionsBuilder {
    opts: ConnectOptions,
}

impl ConnectOptionsBuilder {
    #[must_use]
    pub fn new(
        server: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            opts: ConnectOptions::new(server, database, user, password, ""),
        }
    }

    #[must_use]
    pub fn timeout_seconds(mut self, timeout: impl Into<String>) -> Self {
        self.opts.timeout_seconds = timeout.into();
        self
    }

    #[must_use]
    pub fn driver_name(mut self, driver_name: impl Into<String>) -> Self {
        self.opts.driver_name = driver_name.into();
        self
    }

    #[must_use]
    pub fn trust_server_certificate(mut self, trust: bool) -> Self {
        self.opts.trust_server_certificate = trust;
        self
    }

    #[must_use]
    pub fn escaping(mut self, escaping: FieldEscaping) -> Self {
        self.opts.escaping = escaping;
        self
    }

    #[must_use]
    pub fn reconnect(mut self, reconnect: bool) -> Self {
        self.opts.reconnect = reconnect;
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectOptions {
        self.opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_original_connection_string_for_plain_fields() {
        let opts = ConnectOptions::new("db.local", "sales", "sa", "secret", "30");
        assert_eq!(
            opts.odbc_connection_string(),
            "Driver={ODBC Driver 18 for SQL Server};Server=db.local;Database=sales;UID=sa;\
             PWD=secret;TrustServerCertificate=yes;Connection Timeout=30;"
        );
    }

    #[test]
    fn quoted_escaping_neutralizes_injected_attributes() {
        let opts = ConnectOptions::new("db", "x;Trusted_Connection=yes", "sa", "p}w", "5");
        let conn_str = opts.odbc_connection_string();
        assert!(conn_str.contains("Database={x;Trusted_Connection=yes};"));
        assert!(conn_str.contains("PWD={p}}w};"));
    }

    #[test]
    fn verbatim_escaping_concatenates_as_given() {
        let opts = ConnectOptions::new("db", "x;Encrypt=no", "sa", "pw", "5")
            .with_escaping(FieldEscaping::Verbatim);
        assert!(opts.odbc_connection_string().contains("Database=x;Encrypt=no;"));
    }

    #[test]
    fn debug_never_shows_password() {
        let opts = ConnectOptions::new("db", "d", "u", "hunter2", "5");
        let printed = format!("{opts:?}");
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("\"db\""));
    }

    #[test]
    fn login_timeout_parses_whole_seconds_only() {
        let mut opts = ConnectOptions::new("db", "d", "u", "p", " 15 ");
        assert_eq!(opts.login_timeout(), Some(15));
        opts.timeout_seconds = "soon".into();
        assert_eq!(opts.login_timeout(), None);
    }

    #[test]
    fn parses_server_forms() {
        assert_eq!(
            ServerAddress::parse("tcp:sql.example.com,1444"),
            ServerAddress {
                host: "sql.example.com".into(),
                port: Some(1444),
                instance_name: None,
            }
        );
        let named = ServerAddress::parse(r"HOST\SQLEXPRESS");
        assert_eq!(named.host, "HOST");
        assert_eq!(named.instance_name.as_deref(), Some("SQLEXPRESS"));
        assert_eq!(ServerAddress::parse("(local)").host, "localhost");
    }

    #[test]
    fn builder_sets_every_field() {
        let opts = ConnectOptions::builder("s", "d", "u", "p")
            .timeout_seconds("9")
            .driver_name("FreeTDS")
            .trust_server_certificate(false)
            .reconnect(true)
            .finish();
        assert_eq!(opts.login_timeout(), Some(9));
        assert!(opts.reconnect);
        assert!(
            opts.odbc_connection_string()
                .starts_with("Driver={FreeTDS};")
        );
        assert!(opts.odbc_connection_string().contains("TrustServerCertificate=no;"));
    }
}
