use crm_core::{flush_logs, init_logging, ClientDraft, ClientService, OpenOptions};
use std::path::Path;

fn read_logs(dir: &Path) -> String {
    flush_logs();
    let mut text = String::new();
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_file() {
            text.push_str(&std::fs::read_to_string(path).unwrap());
        }
    }
    text
}

fn lines_with<'a>(logs: &'a str, needle: &str) -> Vec<&'a str> {
    logs.lines().filter(|line| line.contains(needle)).collect()
}

#[tokio::test]
async fn service_events_are_metadata_only_at_expected_levels() {
    let log_dir = tempfile::tempdir().unwrap();
    init_logging("debug", log_dir.path()).unwrap();

    let service = ClientService::open(OpenOptions::memory()).await.unwrap();
    let id = service
        .create(ClientDraft::new("Ana Pérez", "ana@example.com", "555-0101"))
        .await
        .unwrap();
    service.find_by_email("ana@example.com").await.unwrap();
    service.count().await.unwrap();
    service.delete(id).await.unwrap();
    service.delete(id).await.unwrap();

    let logs = read_logs(log_dir.path());

    let deletes = lines_with(&logs, "event=client_delete");
    assert_eq!(deletes.len(), 4, "{logs}");
    for line in &deletes {
        if line.contains("removed=") {
            assert!(line.contains("DEBUG"), "{line}");
        } else {
            assert!(line.contains("INFO"), "{line}");
        }
    }
    assert_eq!(lines_with(&logs, "removed=true").len(), 1);
    assert_eq!(lines_with(&logs, "removed=false").len(), 1);

    let finds = lines_with(&logs, "event=client_find_by_email");
    assert_eq!(finds.len(), 1);
    assert!(finds[0].contains("found=true") && finds[0].contains("duration_ms="));

    let counts = lines_with(&logs, "event=client_count");
    assert_eq!(counts.len(), 1);
    assert!(counts[0].contains("count=1") && counts[0].contains("DEBUG"));

    assert!(!logs.contains("ana@example.com"));
    assert!(!logs.contains("Ana Pérez"));
    assert!(!logs.contains("555-0101"));
}
