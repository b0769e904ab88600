//! Sites directory page.
//!
//! Rendering is a single pass over a resolved [`DirectoryView`]. Extensions
//! contribute markup at the fixed insertion points of [`DirectoryHook`]; the
//! renderer never fetches, filters or sorts anything itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use askama::Template;
use tracing::trace;

use crate::application::hooks::{FilterRegistry, Registration, insert_ordered};
use crate::domain::sites::{SiteSummary, UserId};
use crate::util::sync::{read_lock, write_lock};

use super::l10n::{Localizer, TEXT_DOMAIN};
use super::views::{TemplateRenderError, render_page};

const SOURCE: &str = "presentation::directory";

/// Filter slot whose listeners replace the search partial with the legacy
/// inline form.
pub const LEGACY_SEARCH_FORM_FILTER: &str = "bp_directory_blogs_search_form";
pub const NONCE_ACTION: &str = "directory_blogs";
pub const NONCE_FIELD: &str = "_wpnonce-blogs-filter";
pub const SEARCH_FORM_PART: &str = "common/search/dir-search-form";
pub const BLOGS_LOOP_PART: &str = "blogs/blogs-loop";
const SEARCH_QUERY_ARG: &str = "blogs_search";

const INDEX_PAGE: &str = "blogs/index.html";
const BLOGS_LOOP_PAGE: &str = "blogs/blogs-loop.html";
const LEGACY_SEARCH_FORM_PAGE: &str = "blogs/legacy-search-form.html";
const SEARCH_FORM_PAGE: &str = "common/search/dir-search-form.html";

/// Insertion points, in the order they appear on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryHook {
    BeforePage,
    Before,
    BeforeContent,
    SearchFormPart,
    BeforeTabs,
    BlogTypes,
    BlogSubTypes,
    OrderOptions,
    LoopPart,
    Content,
    AfterContent,
    After,
    AfterPage,
}

impl DirectoryHook {
    pub const ALL: [DirectoryHook; 13] = [
        DirectoryHook::BeforePage,
        DirectoryHook::Before,
        DirectoryHook::BeforeContent,
        DirectoryHook::SearchFormPart,
        DirectoryHook::BeforeTabs,
        DirectoryHook::BlogTypes,
        DirectoryHook::BlogSubTypes,
        DirectoryHook::OrderOptions,
        DirectoryHook::LoopPart,
        DirectoryHook::Content,
        DirectoryHook::AfterContent,
        DirectoryHook::After,
        DirectoryHook::AfterPage,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            DirectoryHook::BeforePage => "bp_before_directory_blogs_page",
            DirectoryHook::Before => "bp_before_directory_blogs",
            DirectoryHook::BeforeContent => "bp_before_directory_blogs_content",
            DirectoryHook::SearchFormPart => "get_template_part_common/search/dir-search-form",
            DirectoryHook::BeforeTabs => "bp_before_directory_blogs_tabs",
            DirectoryHook::BlogTypes => "bp_blogs_directory_blog_types",
            DirectoryHook::BlogSubTypes => "bp_blogs_directory_blog_sub_types",
            DirectoryHook::OrderOptions => "bp_blogs_directory_order_options",
            DirectoryHook::LoopPart => "get_template_part_blogs/blogs-loop",
            DirectoryHook::Content => "bp_directory_blogs_content",
            DirectoryHook::AfterContent => "bp_after_directory_blogs_content",
            DirectoryHook::After => "bp_after_directory_blogs",
            DirectoryHook::AfterPage => "bp_after_directory_blogs_page",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|hook| hook.name() == name)
    }
}

impl fmt::Display for DirectoryHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type MarkupCallback = Arc<dyn Fn(&DirectoryView) -> String + Send + Sync>;

/// Markup contributions per insertion point plus the legacy search form slot.
#[derive(Default)]
pub struct DirectoryHooks {
    markup: RwLock<HashMap<DirectoryHook, Vec<Registration<MarkupCallback>>>>,
    pub search_form: FilterRegistry<String>,
}

impl DirectoryHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&self, hook: DirectoryHook, priority: i32, callback: F)
    where
        F: Fn(&DirectoryView) -> String + Send + Sync + 'static,
    {
        trace!(hook = %hook, priority, "directory markup registered");
        let callback: MarkupCallback = Arc::new(callback);
        let mut markup = write_lock(&self.markup, SOURCE, "add");
        insert_ordered(
            markup.entry(hook).or_default(),
            Registration {
                id: None,
                priority,
                callback,
            },
        );
    }

    pub fn has(&self, hook: DirectoryHook) -> bool {
        read_lock(&self.markup, SOURCE, "has")
            .get(&hook)
            .is_some_and(|list| !list.is_empty())
    }

    pub fn has_legacy_search_form(&self) -> bool {
        self.search_form.has(LEGACY_SEARCH_FORM_FILTER)
    }

    /// Concatenated output of every callback on `hook`.
    pub fn collect(&self, hook: DirectoryHook, view: &DirectoryView) -> String {
        let callbacks: Vec<MarkupCallback> = read_lock(&self.markup, SOURCE, "collect")
            .get(&hook)
            .map(|list| list.iter().map(|entry| Arc::clone(&entry.callback)).collect())
            .unwrap_or_default();

        callbacks.iter().map(|callback| callback(view)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerView {
    pub user_id: UserId,
    /// Sites the viewer belongs to.
    pub site_count: u64,
    pub sites_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryView {
    pub total_sites: u64,
    pub directory_permalink: String,
    /// `None` for anonymous visitors.
    pub viewer: Option<ViewerView>,
    pub nonce: String,
    pub referer: String,
    /// Search term echoed back into the legacy form.
    pub search_terms: Option<String>,
    pub sites: Vec<SiteSummary>,
}

/// Partial templates included by the page.
pub trait TemplateParts: Send + Sync {
    /// Unknown slugs render nothing.
    fn render_part(
        &self,
        slug: &str,
        view: &DirectoryView,
        localizer: &dyn Localizer,
    ) -> Result<String, TemplateRenderError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTemplateParts;

impl TemplateParts for DefaultTemplateParts {
    fn render_part(
        &self,
        slug: &str,
        view: &DirectoryView,
        localizer: &dyn Localizer,
    ) -> Result<String, TemplateRenderError> {
        let t = |text: &str| localizer.translate(text, TEXT_DOMAIN);
        match slug {
            SEARCH_FORM_PART => render_page(SEARCH_FORM_PAGE, &DirSearchFormTemplate {
                component: "blogs",
                input_name: SEARCH_QUERY_ARG,
                placeholder: t("Search Sites..."),
                submit_label: t("Search"),
            }),
            BLOGS_LOOP_PART => render_page(BLOGS_LOOP_PAGE, &BlogsLoopTemplate {
                sites: view
                    .sites
                    .iter()
                    .map(|site| SiteCard::from_summary(site, localizer))
                    .collect(),
                empty_message: t("Sorry, there were no sites found."),
                visit_label: t("Visit Site"),
            }),
            _ => Ok(String::new()),
        }
    }
}

struct SiteCard {
    name: String,
    permalink: String,
    description: String,
    last_active: Option<String>,
}

impl SiteCard {
    fn from_summary(site: &SiteSummary, localizer: &dyn Localizer) -> Self {
        let last_active = site.last_active.as_ref().map(|when| {
            let (before, after) = localizer.translate_around("active %s", TEXT_DOMAIN);
            format!("{before}{when}{after}")
        });
        Self {
            name: site.name.clone(),
            permalink: site.permalink.clone(),
            description: site.description.clone(),
            last_active,
        }
    }
}

#[derive(Template)]
#[template(path = "common/search/dir-search-form.html")]
struct DirSearchFormTemplate {
    component: &'static str,
    input_name: &'static str,
    placeholder: String,
    submit_label: String,
}

#[derive(Template)]
#[template(path = "blogs/blogs-loop.html")]
struct BlogsLoopTemplate {
    sites: Vec<SiteCard>,
    empty_message: String,
    visit_label: String,
}

#[derive(Template)]
#[template(path = "blogs/legacy-search-form.html")]
struct LegacySearchFormTemplate {
    input_name: &'static str,
    placeholder: String,
    submit_label: String,
}

/// A `%s` label split around its count.
struct CountLabel {
    before: String,
    count: u64,
    after: String,
}

impl CountLabel {
    fn new(localizer: &dyn Localizer, text: &str, count: u64) -> Self {
        let (before, after) = localizer.translate_around(text, TEXT_DOMAIN);
        Self {
            before,
            count,
            after,
        }
    }
}

struct PersonalTab {
    href: String,
    label: CountLabel,
}

struct OrderOption {
    value: &'static str,
    label: String,
}

/// Collected markup, one field per insertion point.
#[derive(Default)]
struct Slots {
    before_page: String,
    before: String,
    before_content: String,
    search_form_part: String,
    before_tabs: String,
    blog_types: String,
    blog_sub_types: String,
    order_options: String,
    loop_part: String,
    content: String,
    after_content: String,
    after: String,
    after_page: String,
}

impl Slots {
    fn slot_mut(&mut self, hook: DirectoryHook) -> &mut String {
        match hook {
            DirectoryHook::BeforePage => &mut self.before_page,
            DirectoryHook::Before => &mut self.before,
            DirectoryHook::BeforeContent => &mut self.before_content,
            DirectoryHook::SearchFormPart => &mut self.search_form_part,
            DirectoryHook::BeforeTabs => &mut self.before_tabs,
            DirectoryHook::BlogTypes => &mut self.blog_types,
            DirectoryHook::BlogSubTypes => &mut self.blog_sub_types,
            DirectoryHook::OrderOptions => &mut self.order_options,
            DirectoryHook::LoopPart => &mut self.loop_part,
            DirectoryHook::Content => &mut self.content,
            DirectoryHook::AfterContent => &mut self.after_content,
            DirectoryHook::After => &mut self.after,
            DirectoryHook::AfterPage => &mut self.after_page,
        }
    }
}

#[derive(Template)]
#[template(path = "blogs/index.html")]
struct BlogsDirectoryTemplate {
    slots: Slots,
    legacy_search_form: Option<String>,
    search_form: String,
    blogs_loop: String,
    directory_permalink: String,
    all_sites: CountLabel,
    personal: Option<PersonalTab>,
    main_nav_label: String,
    secondary_nav_label: String,
    order_by_label: String,
    order_options: Vec<OrderOption>,
    screen_reader_heading: String,
    nonce_field: &'static str,
    nonce: String,
    referer: String,
}

fn legacy_search_form(
    view: &DirectoryView,
    hooks: &DirectoryHooks,
    localizer: &dyn Localizer,
) -> Result<String, TemplateRenderError> {
    let placeholder = match view.search_terms.as_deref() {
        Some(terms) if !terms.is_empty() => terms.to_string(),
        _ => localizer.translate("Search sites...", TEXT_DOMAIN),
    };
    let markup = render_page(LEGACY_SEARCH_FORM_PAGE, &LegacySearchFormTemplate {
        input_name: SEARCH_QUERY_ARG,
        placeholder,
        submit_label: localizer.translate("Search", TEXT_DOMAIN),
    })?;
    Ok(hooks
        .search_form
        .apply(LEGACY_SEARCH_FORM_FILTER, markup, &[]))
}

/// Render the sites directory page.
///
/// Exactly one search form is emitted: the legacy inline form when the
/// legacy filter slot has listeners, otherwise the search partial. The
/// "My Sites" tab appears only for a viewer who belongs to at least one site.
pub fn render_blogs_directory(
    view: &DirectoryView,
    hooks: &DirectoryHooks,
    parts: &dyn TemplateParts,
    localizer: &dyn Localizer,
) -> Result<String, TemplateRenderError> {
    let t = |text: &str| localizer.translate(text, TEXT_DOMAIN);

    let legacy_search_form = if hooks.has_legacy_search_form() {
        Some(legacy_search_form(view, hooks, localizer)?)
    } else {
        None
    };

    // The search partial's hook fires only when the partial is included.
    let mut slots = Slots::default();
    for hook in DirectoryHook::ALL {
        if hook == DirectoryHook::SearchFormPart && legacy_search_form.is_some() {
            continue;
        }
        *slots.slot_mut(hook) = hooks.collect(hook, view);
    }

    let search_form = match legacy_search_form {
        Some(_) => String::new(),
        None => parts.render_part(SEARCH_FORM_PART, view, localizer)?,
    };
    let blogs_loop = parts.render_part(BLOGS_LOOP_PART, view, localizer)?;

    let personal = view
        .viewer
        .as_ref()
        .filter(|viewer| viewer.site_count > 0)
        .map(|viewer| PersonalTab {
            href: viewer.sites_link.clone(),
            label: CountLabel::new(localizer, "My Sites %s", viewer.site_count),
        });

    let template = BlogsDirectoryTemplate {
        slots,
        legacy_search_form,
        search_form,
        blogs_loop,
        directory_permalink: view.directory_permalink.clone(),
        all_sites: CountLabel::new(localizer, "All Sites %s", view.total_sites),
        personal,
        main_nav_label: t("Sites directory main navigation"),
        secondary_nav_label: t("Sites directory secondary navigation"),
        order_by_label: t("Order By:"),
        order_options: vec![
            OrderOption {
                value: "active",
                label: t("Last Active"),
            },
            OrderOption {
                value: "newest",
                label: t("Newest"),
            },
            OrderOption {
                value: "alphabetical",
                label: t("Alphabetical"),
            },
        ],
        screen_reader_heading: t("Sites directory"),
        nonce_field: NONCE_FIELD,
        nonce: view.nonce.clone(),
        referer: view.referer.clone(),
    };

    render_page(INDEX_PAGE, &template)
}
