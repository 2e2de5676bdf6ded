use super::*;
use bb_core::BbConfig;
use yare::parameterized;

fn cfg() -> BbConfig {
    BbConfig::default()
}

#[test]
fn parses_jobdw_capacity() {
    let body = "#DW jobdw capacity=1GiB access_mode=striped type=scratch\nsrun./a.out\n";
    let spec = parse_script_directives(body, 1000, &cfg).unwrap();
    let job = spec.job_scratch.unwrap();
    assert_eq!(job.bytes, 1 << 30);
    assert_eq!(job.access_mode.as_deref(), Some("striped"));
    assert_eq!(job.buffer_type.as_deref(), Some("scratch"));
}

#[test]
fn parses_swap_directive() {
    let body = "#DW swap 4\n";
    let spec = parse_script_directives(body, 1000, &cfg).unwrap();
    assert_eq!(spec.swap_gib, Some(4));
}

#[test]
fn stops_scanning_at_first_non_directive_line() {
    let body = "#DW jobdw capacity=1GiB\nsrun./a.out\n#DW swap 4\n";
    let spec = parse_script_directives(body, 1000, &cfg).unwrap();
    assert!(spec.job_scratch.is_some());
    assert!(spec.swap_gib.is_none(), "swap line after script body must be ignored");
}

#[test]
fn persistent_create_requires_non_numeric_name() {
    let body = "#BB create_persistent name=9bad capacity=1GiB\n";
    let mut c = cfg;
    c.allow_all_persistent = true;
    let err = parse_script_directives(body, 1000, &c).unwrap_err();
    assert!(matches!(err, bb_core::BbError::InvalidRequest(_)));
}

#[test]
fn persistent_directives_denied_for_unprivileged_user_without_site_flag() {
    let body = "#BB create_persistent name=foo capacity=1GiB\n";
    let err = parse_script_directives(body, 1000, &cfg).unwrap_err();
    assert!(matches!(err, bb_core::BbError::InvalidRequest(_)));
}

#[test]
fn persistent_directives_allowed_for_privileged_user() {
    let body = "#BB create_persistent name=foo capacity=1GiB\n";
    let mut c = cfg;
    c.privileged_users.push(1000);
    let spec = parse_script_directives(body, 1000, &c).unwrap();
    assert_eq!(spec.persistent_creates.len(), 1);
}

#[test]
fn persistent_directives_allowed_for_everyone_when_site_flag_set() {
    let body = "#BB destroy_persistent name=foo hurry\n";
    let mut c = cfg;
    c.allow_all_persistent = true;
    let spec = parse_script_directives(body, 42, &c).unwrap();
    assert_eq!(spec.persistent_destroys.len(), 1);
    assert!(spec.persistent_destroys[0].hurry);
}

#[test]
fn persistentdw_records_passive_use() {
    let body = "#DW persistentdw name=shared\n";
    let spec = parse_script_directives(body, 1000, &cfg).unwrap();
    assert_eq!(spec.persistent_uses, vec!["shared".to_string()]);
}

#[test]
fn interactive_form_accepts_capacity_and_swap() {
    let spec = parse_interactive("capacity=2GiB swap=1", 1000, &cfg).unwrap();
    assert_eq!(spec.job_scratch.unwrap().bytes, 2 << 30);
    assert_eq!(spec.swap_gib, Some(1));
}

#[parameterized(
        no_fields = { "capacity=1GiB", None, None },
        access_only = { "capacity=1GiB access_mode=striped", Some("striped"), None },
        type_only = { "capacity=1GiB type=cache", None, Some("cache") },
        both = { "capacity=1GiB access_mode=private type=scratch", Some("private"), Some("scratch") },
    )]
fn jobdw_combinations(line: &str, access: Option<&str>, buffer_type: Option<&str>) {
    let body = format!("#DW jobdw {line}\n");
    let spec = parse_script_directives(&body, 1000, &cfg).unwrap();
    let job = spec.job_scratch.unwrap();
    assert_eq!(job.access_mode.as_deref(), access);
    assert_eq!(job.buffer_type.as_deref(), buffer_type);
}

#[test]
fn unrecognized_directive_keyword_is_invalid_request() {
    let body = "#DW bogus capacity=1GiB\n";
    let err = parse_script_directives(body, 1000, &cfg).unwrap_err();
    assert!(matches!(err, bb_core::BbError::InvalidRequest(_)));
}
