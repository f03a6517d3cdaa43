use super::meta::str_at;
use console_access_spec::Project;
use serde_json::Value;

/// Resource-controller instance to project. Needs a guid and a name.
pub fn project_from_backend(value: &Value) -> Option<Project> {
    if !value.is_object() {
        return None;
    }
    let guid = str_at(value, "/guid").filter(|guid| !guid.is_empty())?;
    let name = str_at(value, "/name").filter(|name| !name.is_empty())?;

    Some(Project {
        guid,
        name,
        region: str_at(value, "/region_id"),
        crn: str_at(value, "/crn").or_else(|| str_at(value, "/id")),
        account_id: str_at(value, "/account_id"),
        resource_group_id: str_at(value, "/resource_group_id"),
        state: str_at(value, "/state"),
        created: str_at(value, "/created_at"),
    })
}

/// `next_url` of a resource-controller page, if another page exists.
pub fn next_page_url(page: &Value) -> Option<String> {
    str_at(page, "/next_url").filter(|next| !next.is_empty())
}
