use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::catalog::client::{CatalogClient, FetchOutcome};
use crate::catalog::session::{LocalStore, LocalStoreError, Navigation, PurchaseError, SessionContext, SessionLoad};
use crate::data_structs::content_item::ContentItem;

pub const ALL_CATEGORIES: &str = "All";

pub const CATEGORIES: [&str; 9] = [
    ALL_CATEGORIES,
    "News",
    "Sports",
    "Entertainment",
    "Esports",
    "Documentary",
    "Lifestyle",
    "Technology",
    "Business",
];

pub const FIRST_PAGE: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub time: &'static str,
    pub title: &'static str,
    pub channel: &'static str,
    pub tag: &'static str,
}

pub const SCHEDULE: [ScheduleEntry; 5] = [
    ScheduleEntry { time: "Now", title: "Headlines Live", channel: "World News 24", tag: "News" },
    ScheduleEntry { time: "19:30", title: "Champions League Pre-show", channel: "Sports Center HD", tag: "Football" },
    ScheduleEntry { time: "20:00", title: "Pro League Finals", channel: "eSports Arena", tag: "Esports" },
    ScheduleEntry { time: "21:00", title: "Ocean Wonders", channel: "Documentary One", tag: "Nature" },
    ScheduleEntry { time: "21:30", title: "Red Carpet Live", channel: "Fashion TV+", tag: "Lifestyle" },
];

/// `"All"` keeps everything in order; any other category keeps the items
/// whose genre is exactly that string.
pub fn filter_by_category<'a>(items: &'a [ContentItem], category: &str) -> Vec<&'a ContentItem> {
    if category == ALL_CATEGORIES {
        return items.iter().collect();
    }
    items.iter().filter(|item| item.genre == category).collect()
}

pub fn view_details(item: &ContentItem) -> Navigation {
    Navigation::To(format!("/content/{}", item.id))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub item_id: String,
    pub title: String,
    pub price: u64,
    pub remaining: u64,
}

impl std::fmt::Display for PurchaseReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Successfully purchased \"{}\" for {} credits!", self.title, self.price)
    }
}

/// Cleared when the page goes away, so a late fetch result is dropped.
#[derive(Debug, Clone)]
pub struct PageLifecycle {
    mounted: Arc<AtomicBool>,
}

impl PageLifecycle {
    fn new() -> Self {
        PageLifecycle { mounted: Arc::new(AtomicBool::new(true)) }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn teardown(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }
}

/// The Live TV page: session, channel list, active category.
#[derive(Debug)]
pub struct LiveTvPage<S: LocalStore> {
    session: SessionContext<S>,
    client: CatalogClient,
    channels: FetchOutcome,
    active_category: String,
    lifecycle: PageLifecycle,
}

impl<S: LocalStore> LiveTvPage<S> {

    /// Opens the page for the cached session, or tells the caller where to
    /// go when there is none.
    pub fn open(store: S, client: CatalogClient, now: DateTime<Utc>) -> Result<Result<Self, Navigation>, LocalStoreError> {
        let page = match SessionContext::load(store, now)? {
            SessionLoad::Active(session) => Ok(LiveTvPage {
                session,
                client,
                channels: FetchOutcome::Empty,
                active_category: ALL_CATEGORIES.to_string(),
                lifecycle: PageLifecycle::new(),
            }),
            SessionLoad::Redirect(navigation) => Err(navigation),
        };
        Ok(page)
    }

    pub fn lifecycle(&self) -> PageLifecycle {
        self.lifecycle.clone()
    }

    /// Fetches the first page of channels at the client's page size. Returns
    /// whether the result was applied; it is dropped when the page was torn
    /// down meanwhile.
    pub async fn load_channels(&mut self) -> bool {
        let outcome = self.client.fetch_channels(FIRST_PAGE, self.client.page_size()).await;
        if !self.lifecycle.is_mounted() {
            log::debug!("dropping channel list for a closed page");
            return false;
        }
        self.channels = outcome;
        true
    }

    pub fn fetch_outcome(&self) -> &FetchOutcome {
        &self.channels
    }

    pub fn session(&self) -> &SessionContext<S> {
        &self.session
    }

    pub fn credits(&self) -> u64 {
        self.session.credits()
    }

    /// Every channel, for the "Now Playing" strip.
    pub fn now_playing(&self) -> &[ContentItem] {
        self.channels.items()
    }

    pub fn categories(&self) -> &'static [&'static str] {
        &CATEGORIES
    }

    pub fn active_category(&self) -> &str {
        &self.active_category
    }

    pub fn set_category(&mut self, category: &str) {
        self.active_category = category.to_string();
    }

    pub fn visible_channels(&self) -> Vec<&ContentItem> {
        filter_by_category(self.channels.items(), &self.active_category)
    }

    pub fn section_title(&self) -> String {
        if self.active_category == ALL_CATEGORIES {
            "All Channels".to_string()
        } else {
            format!("{} Channels", self.active_category)
        }
    }

    pub fn schedule(&self) -> &'static [ScheduleEntry] {
        &SCHEDULE
    }

    pub fn purchase(&mut self, item: &ContentItem) -> Result<PurchaseReceipt, PurchaseError> {
        let remaining = self.session.spend(item.price)?;
        log::info!("{} bought {} for {} credits", self.session.email(), item.id, item.price);
        Ok(PurchaseReceipt {
            item_id: item.id.clone(),
            title: item.title.clone(),
            price: item.price,
            remaining,
        })
    }

    pub fn view_details(&self, item: &ContentItem) -> Navigation {
        view_details(item)
    }
}
