//! Serving kinds: services, their status conditions and URLs.

use crate::model::meta::{LabelSelector, ObjectMeta, Time, TypeMeta};
use crate::model::quantity::Quantity;
use crate::{impl_fill, impl_object};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Credentials embedded in a [`Url`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInfo {
    /// User name.
    pub username: String,
    /// Password, if one was given.
    pub password: Option<String>,
}

impl_fill!(UserInfo { username, password });

/// An absolute URL, kept in its escaped component form.
///
/// Rendered as `scheme://[user[:password]@]host[/raw_path][?raw_query]`.
/// `raw_path` and `raw_query` are stored already escaped; a separator left
/// unescaped in either changes how the rendered URL parses back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Url {
    /// Scheme without `://`.
    pub scheme: String,
    /// Optional credentials.
    pub user: Option<UserInfo>,
    /// Host (and port).
    pub host: String,
    /// Escaped path without the leading `/`.
    pub raw_path: String,
    /// Escaped query without the leading `?`.
    pub raw_query: String,
}

impl_fill!(Url {
    scheme,
    user,
    host,
    raw_path,
    raw_query
});

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme)?;
        if let Some(user) = &self.user {
            f.write_str(&user.username)?;
            if let Some(password) = &user.password {
                write!(f, ":{password}")?;
            }
            f.write_str("@")?;
        }
        f.write_str(&self.host)?;
        if !self.raw_path.is_empty() {
            write!(f, "/{}", self.raw_path)?;
        }
        if !self.raw_query.is_empty() {
            write!(f, "?{}", self.raw_query)?;
        }
        Ok(())
    }
}

/// Error parsing a [`Url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseUrlError {
    input: String,
}

impl fmt::Display for ParseUrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid url {:?}: missing \"://\"", self.input)
    }
}

impl std::error::Error for ParseUrlError {}

impl FromStr for Url {
    type Err = ParseUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = s.split_once("://").ok_or_else(|| ParseUrlError {
            input: s.to_owned(),
        })?;
        let (rest, raw_query) = rest.split_once('?').unwrap_or((rest, ""));
        let (authority, raw_path) = rest.split_once('/').unwrap_or((rest, ""));
        let (user, host) = match authority.rsplit_once('@') {
            Some((info, host)) => {
                let user = match info.split_once(':') {
                    Some((username, password)) => UserInfo {
                        username: username.to_owned(),
                        password: Some(password.to_owned()),
                    },
                    None => UserInfo {
                        username: info.to_owned(),
                        password: None,
                    },
                };
                (Some(user), host)
            },
            None => (None, authority),
        };
        Ok(Self {
            scheme: scheme.to_owned(),
            user,
            host: host.to_owned(),
            raw_path: raw_path.to_owned(),
            raw_query: raw_query.to_owned(),
        })
    }
}

impl Serialize for Url {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Url {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

/// Condition type reported once the service is fully ready.
pub const SERVICE_READY: &str = "Ready";
/// Condition type for the configuration sub-resources.
pub const CONFIGURATIONS_READY: &str = "ConfigurationsReady";
/// Condition type for the route sub-resources.
pub const ROUTES_READY: &str = "RoutesReady";

/// An observation of one aspect of a resource's state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Which aspect this condition describes.
    #[serde(rename = "type")]
    pub condition_type: String,
    /// `True`, `False` or `Unknown`.
    pub status: String,
    /// `Error`, `Warning` or `Info`.
    pub severity: String,
    /// When the status last changed.
    pub last_transition_time: Time,
    /// Machine-readable reason.
    pub reason: String,
    /// Human-readable message.
    pub message: String,
}

impl_fill!(Condition {
    condition_type,
    status,
    severity,
    last_transition_time,
    reason,
    message
});

/// Read/write access to a status's condition list.
pub trait ConditionsAccessor {
    /// Current conditions.
    fn conditions(&self) -> &[Condition];
    /// Replaces the conditions.
    fn set_conditions(&mut self, conditions: Vec<Condition>);
}

/// Desired state of a [`Service`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    /// Which pods back the service.
    pub selector: Option<LabelSelector>,
    /// Resource requests by resource name.
    pub resources: BTreeMap<String, Quantity>,
    /// Request timeout.
    pub timeout_seconds: Option<i64>,
}

impl_fill!(ServiceSpec {
    selector,
    resources,
    timeout_seconds
});

/// Observed state of a [`Service`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    /// Generation last acted on by the controller.
    pub observed_generation: i64,
    /// Conditions.
    pub conditions: Vec<Condition>,
    /// Public URL.
    pub url: Option<Url>,
    /// Cluster-local address.
    pub address: Option<Url>,
    /// Most recent revision that became ready.
    pub latest_ready_revision_name: String,
}

impl_fill!(ServiceStatus {
    observed_generation,
    conditions,
    url,
    address,
    latest_ready_revision_name
});

impl ServiceStatus {
    /// Resets the conditions to the known set, each with status `Unknown`.
    pub fn initialize_conditions(&mut self) {
        self.conditions = [SERVICE_READY, CONFIGURATIONS_READY, ROUTES_READY]
            .into_iter()
            .map(|condition_type| Condition {
                condition_type: condition_type.to_owned(),
                status: "Unknown".to_owned(),
                ..Condition::default()
            })
            .collect();
    }
}

impl ConditionsAccessor for ServiceStatus {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn set_conditions(&mut self, conditions: Vec<Condition>) {
        self.conditions = conditions;
    }
}

/// A routable, revisioned workload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Type tag.
    pub type_meta: TypeMeta,
    /// Object metadata.
    pub metadata: ObjectMeta,
    /// Desired state.
    pub spec: ServiceSpec,
    /// Observed state.
    pub status: ServiceStatus,
}

impl_fill!(Service {
    type_meta,
    metadata,
    spec,
    status
});
impl_object!(Service);

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn test_url_render_and_parse() {
        let url = Url {
            scheme: "https".to_owned(),
            user: Some(UserInfo {
                username: "ann".to_owned(),
                password: Some("pw".to_owned()),
            }),
            host: "example".to_owned(),
            raw_path: "a%2Fb".to_owned(),
            raw_query: "q=1+2".to_owned(),
        };
        let text = url.to_string();
        assert_eq!(text, "https://ann:pw@example/a%2Fb?q=1+2");
        assert_eq!(text.parse::<Url>().unwrap(), url);
    }

    #[test]
    fn test_unescaped_separator_changes_meaning() {
        let url = Url {
            scheme: "http".to_owned(),
            host: "h".to_owned(),
            raw_path: "a?b".to_owned(),
            ..Url::default()
        };
        let back: Url = url.to_string().parse().unwrap();
        assert_ne!(back, url);
        assert_eq!(back.raw_query, "b");
    }

    #[test]
    fn test_url_without_scheme_is_rejected() {
        assert!("example.com/path".parse::<Url>().is_err());
    }

    #[test]
    fn test_initialize_conditions() {
        let mut status = ServiceStatus::default();
        status.initialize_conditions();
        let types: Vec<_> = status
            .conditions()
            .iter()
            .map(|c| c.condition_type.as_str())
            .collect();
        assert_eq!(types, [SERVICE_READY, CONFIGURATIONS_READY, ROUTES_READY]);
        assert!(status.conditions().iter().all(|c| c.status == "Unknown"));
    }
}
