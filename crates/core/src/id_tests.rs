use super::*;

#[test]
fn job_id_round_trips_through_string() {
    let id = JobId::new("12345");
    assert_eq!(id.as_str(), "12345");
    assert_eq!(id.to_string(), "12345");
    assert_eq!(id, "12345");
}

#[test]
fn user_id_displays_numeric() {
    let uid = UserId::new(4200);
    assert_eq!(uid.to_string(), "4200");
    assert_eq!(uid.get(), 4200);
}
