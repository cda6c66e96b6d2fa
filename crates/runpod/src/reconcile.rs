//! Field reconciliation between remote pods and tracked state.
//!
//! The API does not echo every attribute it accepted, so each attribute is
//! classified once in [`POD_FIELDS`] and every merge goes through the
//! functions below. Attributes are handled as JSON objects keyed by state
//! attribute name (see [`crate::lifecycle::PodState`]).

use serde_json::{Map, Value};

/// State attributes keyed by name.
pub type Attributes = Map<String, Value>;

/// Default adopted by a user-mutable attribute when nobody has a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// String default.
    Str(&'static str),
    /// Integer default.
    Int(u64),
    /// Boolean default.
    Bool(bool),
}

impl FieldDefault {
    fn to_value(self) -> Value {
        match self {
            Self::Str(s) => Value::String(s.to_string()),
            Self::Int(n) => Value::from(n),
            Self::Bool(b) => Value::Bool(b),
        }
    }
}

/// How an attribute is owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// Set by the server only; always read back when it exists.
    ServerOwned,
    /// Accepted at creation; a changed desired value means replacement.
    WriteOnce,
    /// Accepted at creation, never read back.
    WriteOnly,
    /// User controlled, echoed back at the server's discretion.
    UserMutable(Option<FieldDefault>),
}

/// Classification of a single attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// State attribute name.
    pub name: &'static str,
    /// Ownership class.
    pub class: FieldClass,
}

const fn field(name: &'static str, class: FieldClass) -> FieldSpec {
    FieldSpec { name, class }
}

/// Classification of every pod attribute.
pub const POD_FIELDS: &[FieldSpec] = &[
    field("id", FieldClass::ServerOwned),
    field("machine_id", FieldClass::ServerOwned),
    field("pod_host_id", FieldClass::ServerOwned),
    field("uptime_in_seconds", FieldClass::ServerOwned),
    field("port_mappings", FieldClass::ServerOwned),
    field("image_name", FieldClass::WriteOnce),
    field("gpu_type_id", FieldClass::WriteOnce),
    field("volume_in_gb", FieldClass::WriteOnce),
    field("ports", FieldClass::WriteOnce),
    field("volume_mount_path", FieldClass::WriteOnce),
    field("docker_args", FieldClass::WriteOnce),
    field("network_volume_id", FieldClass::WriteOnce),
    field("template_id", FieldClass::WriteOnce),
    field("data_center_id", FieldClass::WriteOnce),
    field("env", FieldClass::WriteOnly),
    field("gpu_type_ids", FieldClass::WriteOnly),
    field("min_vcpu_count", FieldClass::WriteOnly),
    field("min_memory_in_gb", FieldClass::WriteOnly),
    field("name", FieldClass::UserMutable(None)),
    field("gpu_count", FieldClass::UserMutable(Some(FieldDefault::Int(1)))),
    field("container_disk_in_gb", FieldClass::UserMutable(Some(FieldDefault::Int(20)))),
    field("cloud_type", FieldClass::UserMutable(Some(FieldDefault::Str("ALL")))),
    field("support_public_ip", FieldClass::UserMutable(Some(FieldDefault::Bool(true)))),
    field("start_ssh", FieldClass::UserMutable(Some(FieldDefault::Bool(true)))),
    field("desired_status", FieldClass::UserMutable(Some(FieldDefault::Str("RUNNING")))),
];

/// Look up the class of an attribute.
#[must_use]
pub fn classify(table: &[FieldSpec], name: &str) -> Option<FieldClass> {
    table.iter().find(|spec| spec.name == name).map(|spec| spec.class)
}

/// Whether a value carries information: not null, not an empty string or collection.
#[must_use]
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(_) => true,
    }
}

fn pick(value: Option<&Value>) -> Option<Value> {
    is_present(value).then(|| value.cloned()).flatten()
}

fn get_or_null(attrs: &Attributes, name: &str) -> Value {
    attrs.get(name).cloned().unwrap_or(Value::Null)
}

/// Merge a freshly fetched remote object into prior state.
///
/// Never replaces a write-only or unconfirmed user-mutable attribute with an
/// absent remote value. Attributes outside `table` are dropped.
#[must_use]
pub fn merge(table: &[FieldSpec], remote: Option<&Attributes>, prior: &Attributes) -> Attributes {
    let remote_value = |name: &str| remote.and_then(|r| pick(r.get(name)));

    table
        .iter()
        .map(|spec| {
            let value = match spec.class {
                FieldClass::ServerOwned | FieldClass::WriteOnce => {
                    remote_value(spec.name).unwrap_or_else(|| get_or_null(prior, spec.name))
                }
                FieldClass::WriteOnly => get_or_null(prior, spec.name),
                FieldClass::UserMutable(default) => remote_value(spec.name)
                    .or_else(|| prior.get(spec.name).filter(|v| !v.is_null()).cloned())
                    .or_else(|| default.map(FieldDefault::to_value))
                    .unwrap_or(Value::Null),
            };
            (spec.name.to_string(), value)
        })
        .collect()
}

/// Build post-update state from the planned attributes.
///
/// Server-owned attributes come from `prior` unchanged. Write-only attributes
/// follow the plan verbatim. Everything else follows the plan where it has a
/// value and keeps the prior value otherwise.
#[must_use]
pub fn carry_forward(table: &[FieldSpec], planned: &Attributes, prior: &Attributes) -> Attributes {
    table
        .iter()
        .map(|spec| {
            let value = match spec.class {
                FieldClass::ServerOwned => get_or_null(prior, spec.name),
                FieldClass::WriteOnly => get_or_null(planned, spec.name),
                FieldClass::WriteOnce | FieldClass::UserMutable(_) => pick(planned.get(spec.name))
                    .unwrap_or_else(|| get_or_null(prior, spec.name)),
            };
            (spec.name.to_string(), value)
        })
        .collect()
}

/// Attributes whose desired value differs from the tracked one.
///
/// An absent desired value only counts as a change for write-only attributes;
/// elsewhere it means the user has no opinion.
#[must_use]
pub fn changed_fields(table: &[FieldSpec], desired: &Attributes, prior: &Attributes) -> Vec<&'static str> {
    table
        .iter()
        .filter(|spec| spec.class != FieldClass::ServerOwned)
        .filter(|spec| {
            let wanted = desired.get(spec.name);
            let tracked = prior.get(spec.name);
            match (is_present(wanted), is_present(tracked)) {
                (false, false) => false,
                (false, true) => spec.class == FieldClass::WriteOnly,
                _ => wanted != tracked,
            }
        })
        .map(|spec| spec.name)
        .collect()
}

/// Write-once attributes whose change forces the pod to be replaced.
#[must_use]
pub fn replacement_fields(table: &[FieldSpec], desired: &Attributes, prior: &Attributes) -> Vec<&'static str> {
    changed_fields(table, desired, prior)
        .into_iter()
        .filter(|name| classify(table, name) == Some(FieldClass::WriteOnce))
        .collect()
}
