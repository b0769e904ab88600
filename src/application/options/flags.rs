//! Feature-flag accessors. Each reads its option, casts it, and passes the
//! result through its own filter so a single flag can be overridden without
//! touching storage.

use serde::Serialize;

use super::OptionService;
use crate::domain::options::{OptionKey, OptionValue};

pub const DISABLE_PROFILE_SYNC_FILTER: &str = "bp_disable_profile_sync";
pub const HIDE_LOGGEDOUT_ADMINBAR_FILTER: &str = "bp_hide_loggedout_adminbar";
pub const DISABLE_AVATAR_UPLOADS_FILTER: &str = "bp_disable_avatar_uploads";
pub const DISABLE_COVER_IMAGE_UPLOADS_FILTER: &str = "bp_disable_cover_image_uploads";
pub const DISABLE_GROUP_AVATAR_UPLOADS_FILTER: &str = "bp_disable_group_avatar_uploads";
pub const DISABLE_GROUP_COVER_IMAGE_UPLOADS_FILTER: &str = "bp_disable_group_cover_image_uploads";
pub const DISABLE_ACCOUNT_DELETION_FILTER: &str = "bp_disable_account_deletion";
pub const DISABLE_BLOGFORUM_COMMENTS_FILTER: &str = "bp_disable_blogforum_comments";
pub const RESTRICT_GROUP_CREATION_FILTER: &str = "bp_restrict_group_creation";
pub const AKISMET_ACTIVE_FILTER: &str = "bp_is_akismet_active";
pub const HEARTBEAT_ACTIVE_FILTER: &str = "bp_is_activity_heartbeat_active";
pub const THEME_PACKAGE_ID_FILTER: &str = "bp_get_theme_package_id";

/// Every flag resolved at once, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureFlags {
    pub disable_profile_sync: bool,
    pub hide_loggedout_adminbar: bool,
    pub disable_avatar_uploads: bool,
    pub disable_cover_image_uploads: bool,
    pub disable_group_avatar_uploads: bool,
    pub disable_group_cover_image_uploads: bool,
    pub disable_account_deletion: bool,
    pub disable_blogforum_comments: bool,
    pub restrict_group_creation: bool,
    pub akismet_active: bool,
    pub activity_heartbeat_active: bool,
    pub theme_package_id: String,
}

impl OptionService {
    async fn flag(&self, key: OptionKey, filter: &str, default: bool) -> bool {
        let stored = self.get_option_or(key, default).await.as_bool();
        self.hooks
            .values
            .apply(filter, OptionValue::Bool(stored), &[])
            .as_bool()
    }

    pub async fn disable_profile_sync(&self, default: Option<bool>) -> bool {
        self.flag(
            OptionKey::DisableProfileSync,
            DISABLE_PROFILE_SYNC_FILTER,
            default.unwrap_or(false),
        )
        .await
    }

    pub async fn hide_loggedout_adminbar(&self, default: Option<bool>) -> bool {
        self.flag(
            OptionKey::HideLoggedoutAdminbar,
            HIDE_LOGGEDOUT_ADMINBAR_FILTER,
            default.unwrap_or(true),
        )
        .await
    }

    pub async fn disable_avatar_uploads(&self, default: Option<bool>) -> bool {
        self.flag(
            OptionKey::DisableAvatarUploads,
            DISABLE_AVATAR_UPLOADS_FILTER,
            default.unwrap_or(true),
        )
        .await
    }

    pub async fn disable_cover_image_uploads(&self, default: Option<bool>) -> bool {
        self.flag(
            OptionKey::DisableCoverImageUploads,
            DISABLE_COVER_IMAGE_UPLOADS_FILTER,
            default.unwrap_or(false),
        )
        .await
    }

    /// Group avatars follow member avatars until the group option is set.
    ///
    /// An empty stored value means "never set": the caller's `default` is
    /// used when given, otherwise [`Self::disable_avatar_uploads`].
    pub async fn disable_group_avatar_uploads(&self, default: Option<bool>) -> bool {
        let stored = self
            .get_option_or(
                OptionKey::DisableGroupAvatarUploads,
                OptionValue::empty_text(),
            )
            .await;

        let disabled = if stored.is_empty_text() {
            match default {
                Some(value) => OptionValue::Bool(value),
                None => OptionValue::Bool(self.disable_avatar_uploads(None).await),
            }
        } else {
            stored
        };

        let passed_default = default.map_or_else(OptionValue::empty_text, OptionValue::Bool);
        self.hooks
            .values
            .apply(DISABLE_GROUP_AVATAR_UPLOADS_FILTER, disabled, &[passed_default])
            .as_bool()
    }

    pub async fn disable_group_cover_image_uploads(&self, default: Option<bool>) -> bool {
        self.flag(
            OptionKey::DisableGroupCoverImageUploads,
            DISABLE_GROUP_COVER_IMAGE_UPLOADS_FILTER,
            default.unwrap_or(false),
        )
        .await
    }

    pub async fn disable_account_deletion(&self, default: Option<bool>) -> bool {
        self.flag(
            OptionKey::DisableAccountDeletion,
            DISABLE_ACCOUNT_DELETION_FILTER,
            default.unwrap_or(false),
        )
        .await
    }

    pub async fn disable_blogforum_comments(&self, default: Option<bool>) -> bool {
        self.flag(
            OptionKey::DisableBlogforumComments,
            DISABLE_BLOGFORUM_COMMENTS_FILTER,
            default.unwrap_or(false),
        )
        .await
    }

    pub async fn restrict_group_creation(&self, default: Option<bool>) -> bool {
        self.flag(
            OptionKey::RestrictGroupCreation,
            RESTRICT_GROUP_CREATION_FILTER,
            default.unwrap_or(true),
        )
        .await
    }

    pub async fn is_akismet_active(&self, default: Option<bool>) -> bool {
        self.flag(
            OptionKey::EnableAkismet,
            AKISMET_ACTIVE_FILTER,
            default.unwrap_or(true),
        )
        .await
    }

    pub async fn is_activity_heartbeat_active(&self, default: Option<bool>) -> bool {
        self.flag(
            OptionKey::EnableHeartbeatRefresh,
            HEARTBEAT_ACTIVE_FILTER,
            default.unwrap_or(true),
        )
        .await
    }

    /// Identifier of the active template pack.
    pub async fn theme_package_id(&self, default: Option<&str>) -> String {
        let stored = self
            .get_option_or(OptionKey::ThemePackageId, default.unwrap_or("legacy"))
            .await;
        self.hooks
            .values
            .apply(THEME_PACKAGE_ID_FILTER, stored, &[])
            .as_text()
    }

    pub async fn feature_flags(&self) -> FeatureFlags {
        FeatureFlags {
            disable_profile_sync: self.disable_profile_sync(None).await,
            hide_loggedout_adminbar: self.hide_loggedout_adminbar(None).await,
            disable_avatar_uploads: self.disable_avatar_uploads(None).await,
            disable_cover_image_uploads: self.disable_cover_image_uploads(None).await,
            disable_group_avatar_uploads: self.disable_group_avatar_uploads(None).await,
            disable_group_cover_image_uploads: self.disable_group_cover_image_uploads(None).await,
            disable_account_deletion: self.disable_account_deletion(None).await,
            disable_blogforum_comments: self.disable_blogforum_comments(None).await,
            restrict_group_creation: self.restrict_group_creation(None).await,
            akismet_active: self.is_akismet_active(None).await,
            activity_heartbeat_active: self.is_activity_heartbeat_active(None).await,
            theme_package_id: self.theme_package_id(None).await,
        }
    }
}
