use uuid::Uuid;

/// Generate a fresh opaque id for a list or task.
///
/// Ids are compared by value only; positions shift constantly during a drag,
/// so nothing in the crate keys entities by index.
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Task ids name directories on disk, so they must be a single plain path
/// component.
pub fn is_path_safe(id: &str) -> bool {
    !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\', '\0'])
}
