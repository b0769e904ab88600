//! Typed option schema: the keys this layer owns, their declared defaults,
//! and the value type persisted for them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stored option name mapped to its value.
pub type OptionTable = BTreeMap<String, OptionValue>;

/// A persisted option value.
///
/// Serialized untagged so stored JSON reads naturally (`true`, `"Base"`,
/// `["groups"]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl OptionValue {
    pub fn empty_text() -> Self {
        Self::Text(String::new())
    }

    /// Host truthiness: `""` and `"0"` are false, an empty list is false.
    pub fn as_bool(&self) -> bool {
        match self {
            OptionValue::Bool(value) => *value,
            OptionValue::Text(value) => !(value.is_empty() || value == "0"),
            OptionValue::List(items) => !items.is_empty(),
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            OptionValue::Bool(true) => "1".to_string(),
            OptionValue::Bool(false) => String::new(),
            OptionValue::Text(value) => value.clone(),
            OptionValue::List(items) => items.join(","),
        }
    }

    /// Empty in the host sense; an empty override never shadows storage.
    pub fn is_empty(&self) -> bool {
        !self.as_bool()
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(self, OptionValue::Text(value) if value.is_empty())
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::List(items) => write!(f, "[{}]", items.join(", ")),
            other => f.write_str(&other.as_text()),
        }
    }
}

/// Every option owned by the community layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OptionKey {
    DeactivatedComponents,
    XprofileBaseGroupName,
    XprofileFullnameFieldName,
    BlogsFirstInstall,
    DisableProfileSync,
    HideLoggedoutAdminbar,
    DisableAvatarUploads,
    DisableCoverImageUploads,
    DisableGroupAvatarUploads,
    DisableGroupCoverImageUploads,
    DisableAccountDeletion,
    DisableBlogforumComments,
    ThemePackageId,
    EmailsUnsubscribeSalt,
    RestrictGroupCreation,
    EnableAkismet,
    EnableHeartbeatRefresh,
    IgnoreDeprecatedCode,
}

impl OptionKey {
    pub const ALL: [OptionKey; 18] = [
        OptionKey::DeactivatedComponents,
        OptionKey::XprofileBaseGroupName,
        OptionKey::XprofileFullnameFieldName,
        OptionKey::BlogsFirstInstall,
        OptionKey::DisableProfileSync,
        OptionKey::HideLoggedoutAdminbar,
        OptionKey::DisableAvatarUploads,
        OptionKey::DisableCoverImageUploads,
        OptionKey::DisableGroupAvatarUploads,
        OptionKey::DisableGroupCoverImageUploads,
        OptionKey::DisableAccountDeletion,
        OptionKey::DisableBlogforumComments,
        OptionKey::ThemePackageId,
        OptionKey::EmailsUnsubscribeSalt,
        OptionKey::RestrictGroupCreation,
        OptionKey::EnableAkismet,
        OptionKey::EnableHeartbeatRefresh,
        OptionKey::IgnoreDeprecatedCode,
    ];

    /// Name the value is stored under.
    pub const fn as_str(self) -> &'static str {
        match self {
            OptionKey::DeactivatedComponents => "bp-deactivated-components",
            OptionKey::XprofileBaseGroupName => "bp-xprofile-base-group-name",
            OptionKey::XprofileFullnameFieldName => "bp-xprofile-fullname-field-name",
            OptionKey::BlogsFirstInstall => "bp-blogs-first-install",
            OptionKey::DisableProfileSync => "bp-disable-profile-sync",
            OptionKey::HideLoggedoutAdminbar => "hide-loggedout-adminbar",
            OptionKey::DisableAvatarUploads => "bp-disable-avatar-uploads",
            OptionKey::DisableCoverImageUploads => "bp-disable-cover-image-uploads",
            OptionKey::DisableGroupAvatarUploads => "bp-disable-group-avatar-uploads",
            OptionKey::DisableGroupCoverImageUploads => "bp-disable-group-cover-image-uploads",
            OptionKey::DisableAccountDeletion => "bp-disable-account-deletion",
            OptionKey::DisableBlogforumComments => "bp-disable-blogforum-comments",
            OptionKey::ThemePackageId => "_bp_theme_package_id",
            OptionKey::EmailsUnsubscribeSalt => "bp-emails-unsubscribe-salt",
            OptionKey::RestrictGroupCreation => "bp_restrict_group_creation",
            OptionKey::EnableAkismet => "_bp_enable_akismet",
            OptionKey::EnableHeartbeatRefresh => "_bp_enable_heartbeat_refresh",
            OptionKey::IgnoreDeprecatedCode => "_bp_ignore_deprecated_code",
        }
    }

    pub fn default_value(self) -> OptionValue {
        match self {
            OptionKey::DeactivatedComponents => OptionValue::List(Vec::new()),
            OptionKey::XprofileBaseGroupName => OptionValue::from("Base"),
            OptionKey::XprofileFullnameFieldName => OptionValue::from("Name"),
            OptionKey::ThemePackageId => OptionValue::from("nouveau"),
            // Unset until chosen, so group avatars keep following member avatars.
            OptionKey::EmailsUnsubscribeSalt | OptionKey::DisableGroupAvatarUploads => {
                OptionValue::empty_text()
            }
            OptionKey::DisableBlogforumComments
            | OptionKey::EnableAkismet
            | OptionKey::EnableHeartbeatRefresh
            | OptionKey::IgnoreDeprecatedCode => OptionValue::Bool(true),
            OptionKey::BlogsFirstInstall
            | OptionKey::DisableProfileSync
            | OptionKey::HideLoggedoutAdminbar
            | OptionKey::DisableAvatarUploads
            | OptionKey::DisableCoverImageUploads
            | OptionKey::DisableGroupCoverImageUploads
            | OptionKey::DisableAccountDeletion
            | OptionKey::RestrictGroupCreation => OptionValue::Bool(false),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == name)
    }

    /// The declared defaults, before any extension appends to them.
    pub fn defaults() -> OptionTable {
        Self::ALL
            .into_iter()
            .map(|key| (key.as_str().to_string(), key.default_value()))
            .collect()
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An option name: one of ours, or a third-party key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OptionName {
    Known(OptionKey),
    Custom(String),
}

impl OptionName {
    pub fn as_str(&self) -> &str {
        match self {
            OptionName::Known(key) => key.as_str(),
            OptionName::Custom(name) => name.as_str(),
        }
    }
}

impl From<OptionKey> for OptionName {
    fn from(key: OptionKey) -> Self {
        Self::Known(key)
    }
}

impl From<&str> for OptionName {
    fn from(name: &str) -> Self {
        match OptionKey::from_name(name) {
            Some(key) => Self::Known(key),
            None => Self::Custom(name.to_string()),
        }
    }
}

impl From<String> for OptionName {
    fn from(name: String) -> Self {
        match OptionKey::from_name(&name) {
            Some(key) => Self::Known(key),
            None => Self::Custom(name),
        }
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
