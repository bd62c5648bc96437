use pretty_assertions::assert_eq;
use scan_core::{BatchJob, ItemDescriptor, ItemStatus, JobId, JobStatus, OwnerId};
use serde_json::json;

#[test]
fn statuses_use_snake_case_names() {
    assert_eq!(
        serde_json::to_value(JobStatus::PartiallyFailed).unwrap(),
        json!("partially_failed")
    );
    assert_eq!(
        serde_json::to_value(ItemStatus::NoDataFound).unwrap(),
        json!("no_data_found")
    );
    let status: JobStatus = serde_json::from_value(json!("processing")).unwrap();
    assert_eq!(status, JobStatus::Processing);
    assert!(serde_json::from_value::<JobStatus>(json!("PartiallyFailed")).is_err());
}

#[test]
fn descriptor_fields_are_camel_case_and_optional() {
    let vehicle = ItemDescriptor::new("veh-1", "Honda", "Civic")
        .with_year(2019)
        .with_mileage(42_000);
    let value = serde_json::to_value(&vehicle).unwrap();

    assert_eq!(value["itemId"], json!("veh-1"));
    assert_eq!(value["mileage"], json!(42_000));
    assert!(value.get("item_id").is_none());

    let sparse: ItemDescriptor =
        serde_json::from_value(json!({ "itemId": "veh-2", "make": "Ford", "model": "Ranger" }))
            .unwrap();
    assert_eq!(sparse, ItemDescriptor::new("veh-2", "Ford", "Ranger"));
}

#[test]
fn stored_job_reads_without_error_message() {
    let job: BatchJob = serde_json::from_value(json!({
        "id": "job-a",
        "ownerId": "dealer-1",
        "createdAt": "2024-05-01T10:00:00.000Z",
        "updatedAt": "2024-05-01T10:05:00.000Z",
        "status": "completed",
        "items": [{ "itemId": "veh-1", "make": "Honda", "model": "Civic", "year": 2019 }]
    }))
    .unwrap();

    assert_eq!(job.id, JobId::new("job-a"));
    assert_eq!(job.owner_id, OwnerId::new("dealer-1"));
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.error_message, None);
    assert_eq!(
        job.items,
        vec![ItemDescriptor::new("veh-1", "Honda", "Civic").with_year(2019)]
    );
}
