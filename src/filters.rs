//! Query-string filters and pagination (`spec.md` §4.7).

use crate::error::GatewayError;
use crate::path::DeviceId;
use crate::uri::Query;

const DEFAULT_PAGE_LIMIT: u32 = 255;
const DEFAULT_PAGE_OFFSET: u32 = 0;
/// `spec.md` §4.7: pagination values must fit in `u32/2`.
const MAX_PAGE_VALUE: u32 = u32::MAX / 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceFilter {
    Specific(DeviceId),
    Headstation,
}

/// The additive filter set extracted from `filter[...]` query parameters
/// (`spec.md` §4.7's table).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterFilter {
    pub only_beta: bool,
    pub without_beta: bool,
    pub only_deprecated: bool,
    pub without_deprecated: bool,
    pub only_writeable: bool,
    pub without_writeable: bool,
    pub only_usersettings: bool,
    pub without_usersettings: bool,
    pub device: Option<DeviceFilter>,
    pub subpath: Option<String>,
}

fn parse_bool_value(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Parse the `filter[...]` parameters of `query` into a [`ParameterFilter`].
/// An unrecognised name or an invalid value for a recognised name is a
/// `400 Bad Request` (`spec.md` §4.7).
pub fn parse_parameter_filter(query: &Query) -> Result<ParameterFilter, GatewayError> {
    let mut filter = ParameterFilter::default();
    for (name, value) in query.bracketed("filter") {
        match name.as_str() {
            "beta" => match parse_bool_value(&value) {
                Some(true) => filter.only_beta = true,
                Some(false) => filter.without_beta = true,
                None => return Err(bad_filter_value("beta", &value)),
            },
            "deprecated" => match parse_bool_value(&value) {
                Some(true) => filter.only_deprecated = true,
                Some(false) => filter.without_deprecated = true,
                None => return Err(bad_filter_value("deprecated", &value)),
            },
            "writeable" => match parse_bool_value(&value) {
                Some(true) => filter.only_writeable = true,
                Some(false) => filter.without_writeable = true,
                None => return Err(bad_filter_value("writeable", &value)),
            },
            "userSetting" => match parse_bool_value(&value) {
                Some(true) => filter.only_usersettings = true,
                Some(false) => filter.without_usersettings = true,
                None => return Err(bad_filter_value("userSetting", &value)),
            },
            "device" => {
                filter.device = Some(if value == "headstation" {
                    DeviceFilter::Headstation
                } else {
                    DeviceFilter::Specific(
                        DeviceId::parse(&value).map_err(|_| bad_filter_value("device", &value))?,
                    )
                });
            }
            "path" => {
                if value.is_empty() {
                    return Err(bad_filter_value("path", &value));
                }
                filter.subpath = Some(value);
            }
            other => return Err(GatewayError::bad_request(
                format!("unrecognised filter \"{other}\""),
                format!("filter[{other}]"),
            )),
        }
    }
    Ok(filter)
}

fn bad_filter_value(name: &str, value: &str) -> GatewayError {
    GatewayError::bad_request(
        format!("invalid value \"{value}\" for filter \"{name}\""),
        format!("filter[{name}]"),
    )
}

/// The parsed `page[limit]`/`page[offset]` pair, defaulting to
/// `(255, 0)` and capped (with a warning logged by the caller) to avoid an
/// overflowing sum (`spec.md` §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

pub fn parse_pagination(query: &Query) -> Result<Pagination, GatewayError> {
    let page = query.bracketed("page");
    let limit = match page.get("limit") {
        Some(v) => parse_page_value(v, "limit")?,
        None => DEFAULT_PAGE_LIMIT,
    };
    let mut offset = match page.get("offset") {
        Some(v) => parse_page_value(v, "offset")?,
        None => DEFAULT_PAGE_OFFSET,
    };
    if limit.checked_add(offset).is_none() {
        tracing::warn!(limit, offset, "page[limit] + page[offset] overflows u32, capping offset");
        offset = u32::MAX - limit;
    }
    Ok(Pagination { limit, offset })
}

fn parse_page_value(v: &str, field: &str) -> Result<u32, GatewayError> {
    let n: u32 = v
        .parse()
        .map_err(|_| GatewayError::bad_request(format!("invalid page[{field}] value"), format!("page[{field}]")))?;
    if n > MAX_PAGE_VALUE {
        return Err(GatewayError::bad_request(
            format!("page[{field}] exceeds u32/2"),
            format!("page[{field}]"),
        ));
    }
    Ok(n)
}

/// Parse `include=a.b,c` into a list of segment lists (`spec.md` §4.7).
/// `spec.md` §1 scopes the only supported relationship (`parameters`) to
/// monitoring lists; this just does the generic split, callers validate.
pub fn parse_include(raw: &str) -> Vec<Vec<String>> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',')
        .map(|group| group.split('.').map(str::to_string).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uri::Uri;

    fn query(raw: &str) -> Query {
        Uri::parse(&format!("/x?{raw}")).query()
    }

    #[test]
    fn beta_true_sets_only_beta() {
        let f = parse_parameter_filter(&query("filter[beta]=true")).unwrap();
        assert!(f.only_beta);
        assert!(!f.without_beta);
    }

    #[test]
    fn unknown_filter_name_is_bad_request() {
        assert!(parse_parameter_filter(&query("filter[bogus]=true")).is_err());
    }

    #[test]
    fn invalid_boolean_value_is_bad_request() {
        assert!(parse_parameter_filter(&query("filter[beta]=yes")).is_err());
    }

    #[test]
    fn device_filter_accepts_headstation_or_specific() {
        let f = parse_parameter_filter(&query("filter[device]=headstation")).unwrap();
        assert_eq!(f.device, Some(DeviceFilter::Headstation));
        let f = parse_parameter_filter(&query("filter[device]=1-1")).unwrap();
        assert_eq!(f.device, Some(DeviceFilter::Specific(DeviceId::new(1, 1))));
    }

    #[test]
    fn path_filter_rejects_empty_value() {
        assert!(parse_parameter_filter(&query("filter[path]=")).is_err());
    }

    #[test]
    fn pagination_defaults_to_255_and_0() {
        let p = parse_pagination(&query("")).unwrap();
        assert_eq!(p, Pagination { limit: 255, offset: 0 });
    }

    #[test]
    fn pagination_rejects_values_over_u32_half() {
        let too_big = (u32::MAX / 2) as u64 + 1;
        assert!(parse_pagination(&query(&format!("page[limit]={too_big}"))).is_err());
    }

    #[test]
    fn include_splits_groups_and_segments() {
        let parsed = parse_include("a.b,c");
        assert_eq!(parsed, vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]);
    }

    #[test]
    fn include_empty_is_empty_list() {
        assert!(parse_include("").is_empty());
    }
}
