//! Customizers for serving kinds.

use super::meta::THOUSAND_YEARS_SECS;
use super::Customizers;
use crate::escape::{path_escape, query_escape};
use crate::generate::{GenResult, Generator};
use crate::model::{ConditionsAccessor, ServiceStatus, Time, Url, UserInfo};

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const COMPONENT_MAX_LEN: usize = 50;
const SEVERITY_MAX_LEN: usize = 20;

pub(super) fn register(customizers: &mut Customizers) {
    customizers.register::<Url, _>(url);
    customizers.register::<ServiceStatus, _>(service_status);
}

fn letters(g: &mut Generator<'_, '_>, max_len: usize) -> GenResult<String> {
    Ok(g.cursor().get_string_from(LETTERS, max_len)?)
}

/// Letter-only scheme, host and credentials; escaped path and query.
pub fn url(u: &mut Url, g: &mut Generator<'_, '_>) -> GenResult<()> {
    let scheme = letters(g, COMPONENT_MAX_LEN)?;
    let host = letters(g, COMPONENT_MAX_LEN)?;
    let username = letters(g, COMPONENT_MAX_LEN)?;
    let password = letters(g, COMPONENT_MAX_LEN)?;
    let max = g.limits().max_string_len;
    let path = g.cursor().get_string(max)?;
    let query = g.cursor().get_string(max)?;
    *u = Url {
        scheme,
        user: Some(UserInfo {
            username,
            password: Some(password),
        }),
        host,
        raw_path: path_escape(&path),
        raw_query: query_escape(&query),
    };
    Ok(())
}

/// Regenerates every condition's status, severity, message, reason and
/// transition time. Condition types are left as they are.
pub fn fuzz_conditions<A>(accessor: &mut A, g: &mut Generator<'_, '_>) -> GenResult<()>
where
    A: ConditionsAccessor + ?Sized,
{
    let mut conditions = accessor.conditions().to_vec();
    for condition in &mut conditions {
        condition.status = letters(g, COMPONENT_MAX_LEN)?;
        condition.severity = letters(g, SEVERITY_MAX_LEN)?;
        condition.message = letters(g, COMPONENT_MAX_LEN)?;
        condition.reason = letters(g, COMPONENT_MAX_LEN)?;
        let secs = g.cursor().get_u64()? % THOUSAND_YEARS_SECS;
        condition.last_transition_time = Time::from_unix(secs as i64, 0).unwrap_or_default();
    }
    accessor.set_conditions(conditions);
    Ok(())
}

/// Structural status whose conditions are replaced by the known set and
/// then fuzzed.
pub fn service_status(s: &mut ServiceStatus, g: &mut Generator<'_, '_>) -> GenResult<()> {
    g.generate_default(s)?;
    s.initialize_conditions();
    fuzz_conditions(s, g)
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::super::test_support::{bytes, defaults, generate};
    use super::*;
    use crate::generate::GeneratorLimits;
    use crate::model::serving::{CONFIGURATIONS_READY, ROUTES_READY, SERVICE_READY};
    use crate::model::Condition;

    #[test]
    fn test_url_components_are_letters() {
        let customizers = defaults();
        for seed in 0..16 {
            let u: Url = generate(&customizers, &bytes(seed)).unwrap();
            assert!(u.scheme.chars().all(|c| c.is_ascii_alphabetic()));
            assert!(u.host.chars().all(|c| c.is_ascii_alphabetic()));
            let user = u.user.clone().unwrap();
            assert!(user.username.len() <= COMPONENT_MAX_LEN);
            assert!(user.password.is_some());
            assert_eq!(u.to_string().parse::<Url>().unwrap(), u);
        }
    }

    #[test]
    fn test_url_escapes_separators() {
        // four empty letter components, then path "a/b?c" and query "x&y=z"
        let mut data = vec![0u8, 0, 0, 0];
        data.push(5);
        data.extend_from_slice(b"a/b?c");
        data.push(5);
        data.extend_from_slice(b"x&y=z");
        let customizers = defaults();
        let mut g = Generator::new(&data, &customizers, GeneratorLimits::default());
        let mut u = Url::default();
        url(&mut u, &mut g).unwrap();
        assert_eq!(u.raw_path, "a%2Fb%3Fc");
        assert_eq!(u.raw_query, "x%26y%3Dz");
        assert_eq!(u.to_string().parse::<Url>().unwrap(), u);
    }

    struct Conditions(Vec<Condition>);

    impl ConditionsAccessor for Conditions {
        fn conditions(&self) -> &[Condition] {
            &self.0
        }

        fn set_conditions(&mut self, conditions: Vec<Condition>) {
            self.0 = conditions;
        }
    }

    #[test]
    fn test_fuzz_conditions_keeps_types() {
        let customizers = defaults();
        let data = bytes(9);
        let mut g = Generator::new(&data, &customizers, GeneratorLimits::default());
        let mut holder = Conditions(
            ["A", "B", "C"]
                .into_iter()
                .map(|t| Condition {
                    condition_type: t.to_owned(),
                    ..Condition::default()
                })
                .collect(),
        );
        fuzz_conditions(&mut holder, &mut g).unwrap();
        let types: Vec<&str> = holder.0.iter().map(|c| c.condition_type.as_str()).collect();
        assert_eq!(types, ["A", "B", "C"]);
        for c in &holder.0 {
            assert!(c.severity.len() <= SEVERITY_MAX_LEN);
            assert_eq!(c.last_transition_time.subsec_nanos(), 0);
        }
    }

    #[test]
    fn test_service_status_has_known_conditions() {
        let customizers = defaults();
        let s: ServiceStatus = generate(&customizers, &bytes(4)).unwrap();
        let types: Vec<&str> = s.conditions.iter().map(|c| c.condition_type.as_str()).collect();
        assert_eq!(types, [SERVICE_READY, CONFIGURATIONS_READY, ROUTES_READY]);
    }

    #[test]
    fn test_exhaustion_is_not_papered_over() {
        let customizers = defaults();
        let data = [3u8, b'a', b'b'];
        let mut g = Generator::new(&data, &customizers, GeneratorLimits::default());
        let mut u = Url::default();
        assert!(url(&mut u, &mut g).is_err());
    }
}
