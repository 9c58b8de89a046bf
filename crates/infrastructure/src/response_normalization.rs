//! Converts backend response envelopes into domain shapes.
//!
//! Endpoints wrap payloads inconsistently (`data`, `data.data`,
//! `data.data.data`) and spell fields in several ways. All of that is
//! resolved here so application code only sees canonical types.

use std::collections::BTreeSet;

use estatedesk_core::{AppError, AppResult};
use estatedesk_domain::{
    ListRecord, Pagination, PermissionDefinition, PermissionGrant, RecordPage,
};
use serde_json::Value;
use tracing::warn;

const MAX_DATA_NESTING: usize = 3;

/// Finds the payload array at the top level or under up to three `data` keys.
fn unwrap_array(payload: &Value) -> Option<&Vec<Value>> {
    let mut current = payload;
    for _ in 0..=MAX_DATA_NESTING {
        if let Some(items) = current.as_array() {
            return Some(items);
        }
        current = current.get("data")?;
    }

    current.as_array()
}

fn first_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| value.get(*key))
}

fn lenient_u64(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn lenient_u32(value: Option<&Value>) -> Option<u32> {
    lenient_u64(value).and_then(|value| u32::try_from(value).ok())
}

fn lenient_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
        _ => None,
    }
}

fn verbatim_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        _ => None,
    }
}

/// Extracts the human-readable error message of a response body.
///
/// The text is returned as sent; blank messages count as missing.
#[must_use]
pub fn server_message(payload: &Value) -> Option<String> {
    if payload.is_string() {
        return verbatim_text(payload);
    }

    ["message", "error", "msg"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(verbatim_text))
        .or_else(|| payload.get("data").and_then(server_message))
}

/// Normalizes a list response into rows and pagination.
pub fn normalize_record_page(payload: &Value) -> AppResult<RecordPage> {
    let items = unwrap_array(payload).ok_or_else(|| {
        AppError::Internal("list response did not contain a row array".to_owned())
    })?;

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        match ListRecord::from_value(item.clone()) {
            Ok(row) => rows.push(row),
            Err(error) => warn!(error = %error, "skipping malformed list row"),
        }
    }

    let pagination_block = payload
        .get("pagination")
        .or_else(|| payload.get("data").and_then(|data| data.get("pagination")));

    let total = lenient_u64(pagination_block.and_then(|block| block.get("total")))
        .unwrap_or(rows.len() as u64);
    let page = lenient_u32(pagination_block.and_then(|block| block.get("page"))).unwrap_or(0);
    let limit = lenient_u32(pagination_block.and_then(|block| block.get("limit"))).unwrap_or(0);
    let total_pages = lenient_u32(
        pagination_block.and_then(|block| first_field(block, &["totalPages", "total_pages"])),
    )
    .unwrap_or(0);

    Ok(RecordPage {
        rows,
        pagination: Pagination {
            total,
            page,
            limit,
            total_pages,
        },
    })
}

fn permission_ids(value: Option<&Value>) -> BTreeSet<u32> {
    let Some(Value::Array(items)) = value else {
        return BTreeSet::new();
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::Object(_) => lenient_u32(first_field(item, &["id", "permissionId"])),
            other => lenient_u32(Some(other)),
        })
        .collect()
}

/// Normalizes the grants response of a role.
pub fn normalize_grants(payload: &Value) -> AppResult<Vec<PermissionGrant>> {
    let items = unwrap_array(payload).ok_or_else(|| {
        AppError::Internal("permission grant response did not contain an array".to_owned())
    })?;

    Ok(items
        .iter()
        .filter_map(|item| {
            let page_name = lenient_text(first_field(item, &["pageName", "page_name", "page"]))?;
            let ids = permission_ids(first_field(
                item,
                &["permissionIds", "permission_ids", "permissions"],
            ));
            Some(PermissionGrant {
                page_name,
                permission_ids: ids,
            })
        })
        .collect())
}

/// Normalizes the global permission catalog.
pub fn normalize_catalog(payload: &Value) -> AppResult<Vec<PermissionDefinition>> {
    let items = unwrap_array(payload).ok_or_else(|| {
        AppError::Internal("permission catalog response did not contain an array".to_owned())
    })?;

    Ok(items
        .iter()
        .filter_map(|item| {
            Some(PermissionDefinition {
                id: lenient_u32(first_field(item, &["id", "permissionId"]))?,
                permission_name: lenient_text(first_field(
                    item,
                    &["permissionName", "permission_name", "name"],
                ))?,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use estatedesk_core::RecordId;
    use serde_json::json;

    use super::{normalize_catalog, normalize_grants, normalize_record_page, server_message};

    #[test]
    fn list_rows_are_found_at_any_nesting() {
        for payload in [
            json!({"success": true, "data": [{"id": 1}], "pagination": {"total": 1}}),
            json!({"data": {"data": [{"id": 1}]}}),
            json!({"data": {"data": {"data": [{"id": 1}]}}}),
            json!([{"id": 1}]),
        ] {
            let page = normalize_record_page(&payload);
            assert!(
                matches!(&page, Ok(page) if page.rows.len() == 1 && page.rows[0].id() == &RecordId::Number(1)),
                "{payload}"
            );
        }
    }

    #[test]
    fn pagination_accepts_strings_and_defaults_total() {
        let payload = json!({
            "data": [{"id": 1}, {"_id": "b"}, {"name": "no id"}],
            "pagination": {"total": "42", "page": 2, "limit": "10", "totalPages": 5}
        });
        let page = normalize_record_page(&payload).unwrap_or_default();
        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.pagination.total, 42);
        assert_eq!(page.pagination.page, 2);
        assert_eq!(page.pagination.total_pages, 5);

        let bare = normalize_record_page(&json!({"data": [{"id": 1}]})).unwrap_or_default();
        assert_eq!(bare.pagination.total, 1);
    }

    #[test]
    fn missing_array_is_an_error() {
        assert!(normalize_record_page(&json!({"data": {"rows": 1}})).is_err());
    }

    #[test]
    fn grants_accept_id_lists_and_objects() {
        let payload = json!({"data": {"data": [
            {"pageName": "Lead", "permissionIds": [1, "2", 3]},
            {"page_name": "Booking", "permissions": [{"id": 4}, {"permissionId": 5}]},
            {"permissionIds": [9]}
        ]}});

        let grants = normalize_grants(&payload).unwrap_or_default();
        assert_eq!(grants.len(), 2);
        assert_eq!(grants[0].permission_ids.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(grants[1].page_name, "Booking");
        assert_eq!(grants[1].permission_ids.len(), 2);
    }

    #[test]
    fn catalog_skips_incomplete_entries() {
        let payload = json!({"data": [
            {"id": 1, "permissionName": "add"},
            {"id": "6", "name": "bulk assign"},
            {"id": 7}
        ]});

        let catalog = normalize_catalog(&payload).unwrap_or_default();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog[1].id, 6);
    }

    #[test]
    fn server_message_reads_common_fields() {
        assert_eq!(
            server_message(&json!({"success": false, "message": "Only admin can approve"})),
            Some("Only admin can approve".to_owned())
        );
        assert_eq!(
            server_message(&json!({"data": {"error": "nested"}})),
            Some("nested".to_owned())
        );
        assert_eq!(server_message(&json!({"success": false})), None);
    }

    #[test]
    fn server_message_is_kept_verbatim() {
        assert_eq!(
            server_message(&json!({"message": "  Only admin can approve.  "})),
            Some("  Only admin can approve.  ".to_owned())
        );
        assert_eq!(
            server_message(&json!({"message": "   ", "error": "Booking locked"})),
            Some("Booking locked".to_owned())
        );
        assert_eq!(server_message(&json!(" \n")), None);
    }
}
