use super::*;
use std::path::PathBuf;

#[test]
fn job_dir_buckets_by_job_id_modulo_ten() {
    let base = PathBuf::from("/state");
    assert_eq!(job_dir(&base, &JobId::from("42")), base.join("hash.2").join("job.42"));
    assert_eq!(job_dir(&base, &JobId::from("7")), base.join("hash.7").join("job.7"));
}

#[test]
fn non_numeric_job_id_falls_back_to_bucket_zero() {
    let base = PathBuf::from("/state");
    assert_eq!(job_dir(&base, &JobId::from("abc")), base.join("hash.0").join("job.abc"));
}

#[test]
fn artifact_paths_are_nested_under_job_dir() {
    let dir = PathBuf::from("/state/hash.2/job.42");
    assert_eq!(script_path(&dir), dir.join("script"));
    assert_eq!(client_nids_path(&dir), dir.join("client_nids"));
    assert_eq!(pathfile_path(&dir), dir.join("pathfile"));
}
