//! A model of the playwright.dev docs site and the search scenarios that run
//! against it.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;
use vigia::driver::{MemoryElement, MemoryPage, MemoryPageSource, PageState};
use vigia::prelude::*;

pub const HOME: &str = "https://playwright.dev/";
pub const INTRO: &str = "https://playwright.dev/docs/intro";

/// How the home page exposes search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEntry {
    /// DocSearch button plus the keyboard shortcut
    Button,
    /// Keyboard shortcut only
    ShortcutOnly,
    /// No search at all
    Missing,
}

/// Fresh docs site page with `entry`
pub fn docs_site(entry: SearchEntry) -> MemoryPage {
    let page = MemoryPage::new();
    page.route(HOME, move |s| build_home(s, entry));
    page.route(INTRO, build_intro);
    page
}

/// Page source handing out fresh docs site pages
pub fn docs_source(entry: SearchEntry) -> MemoryPageSource {
    MemoryPageSource::new(move || docs_site(entry))
}

fn build_home(s: &mut PageState, entry: SearchEntry) {
    s.set_title("Fast and reliable end-to-end testing for modern web apps | Playwright");
    let nav = s.add(MemoryElement::new("nav").attr("aria-label", "Main"));
    s.add(MemoryElement::new("a").attr("href", "/").text("Playwright").child_of(nav));
    s.add(MemoryElement::new("h1").text("Playwright enables reliable end-to-end testing for modern web apps."));
    let get_started = s.add(
        MemoryElement::new("a")
            .attr("href", "/docs/intro")
            .attr("class", "getStarted")
            .text("Get started"),
    );
    s.on_click(get_started, |s| s.navigate(INTRO));

    if entry == SearchEntry::Missing {
        return;
    }

    let modal = s.add(
        MemoryElement::new("div")
            .attr("class", "DocSearch-Modal")
            .attr("role", "dialog")
            .hidden(),
    );
    let input = s.add(
        MemoryElement::new("input")
            .attr("type", "search")
            .attr("class", "DocSearch-Input")
            .attr("placeholder", "Search docs")
            .child_of(modal),
    );

    let open = move |s: &mut PageState| {
        s.show(modal);
        s.focus(input);
    };
    if entry == SearchEntry::Button {
        let button = s.add(
            MemoryElement::new("button")
                .attr("class", "DocSearch DocSearch-Button")
                .attr("aria-label", "Search (Command+K)")
                .text("Search ⌘ K")
                .child_of(nav),
        );
        s.on_click(button, open);
    }
    s.on_key(KeyChord::primary(Key::Char('k'), Platform::MacOs), open);
    s.on_key(KeyChord::primary(Key::Char('k'), Platform::Linux), open);
    s.on_key(KeyChord::new(Key::Escape), move |s| {
        s.blur();
        s.hide(modal);
    });
    s.on_key(KeyChord::new(Key::Enter), move |s| {
        if !s.value_of(input).is_some_and(|v| v.contains("Install")) {
            return;
        }
        // results stream in a few polls after submitting
        let hit = s.add(
            MemoryElement::new("a")
                .attr("href", "/docs/intro")
                .text("Installation")
                .child_of(modal)
                .hidden(),
        );
        s.show_after(hit, 3);
        s.on_click(hit, |s| s.navigate(INTRO));
    });
}

fn build_intro(s: &mut PageState) {
    s.set_title("Installation | Playwright");
    s.add(MemoryElement::new("h1").text("Installation"));
    s.add(MemoryElement::new("p").text("Playwright Test was created specifically to accommodate the needs of end-to-end testing."));
}

// =============================================================================
// SCENARIOS
// =============================================================================

pub const VISIBLE_TIMEOUT: Duration = Duration::from_millis(7000);
pub const RESULT_TIMEOUT: Duration = Duration::from_millis(10_000);

pub fn search_button() -> Locator {
    Locator::new(Selector::role_named(
        AriaRole::Button,
        TextMatcher::regex_with_flags("Search|検索|Open search", "i").unwrap(),
    ))
    .first()
}

pub fn search_input() -> Locator {
    Locator::new(Selector::css(
        r#"input[type="search"], input[role="searchbox"], [placeholder*="Search"]"#,
    ))
    .first()
}

pub fn search_entry_chain() -> FallbackChain {
    FallbackChain::new(search_button())
        .or(Locator::new(Selector::css(r#"input[type="search"], input[role="searchbox"]"#)).first())
        .or(Locator::new(Selector::css(
            r#"[aria-label*="search"], [placeholder*="Search"], [data-search]"#,
        ))
        .first())
}

pub fn result_link() -> Locator {
    Locator::new(Selector::role_named(
        AriaRole::Link,
        TextMatcher::regex_with_flags("Installation|Install", "i").unwrap(),
    ))
    .first()
}

pub fn installation_heading() -> Locator {
    Locator::new(Selector::role_named(
        AriaRole::Heading,
        TextMatcher::regex_with_flags("Installation", "i").unwrap(),
    ))
    .first()
}

pub fn before_each() -> Vec<Step> {
    vec![
        Step::goto(HOME),
        Step::wait_for_load_state(LoadState::NetworkIdle),
    ]
}

fn open_search(platform: Platform) -> Vec<Step> {
    vec![
        Step::invoke(search_button(), Key::Char('k'), platform),
        Step::expect(
            search_input(),
            [ElementPredicate::Visible, ElementPredicate::Focused],
        )
        .with_timeout(VISIBLE_TIMEOUT),
    ]
}

pub fn search_button_visible() -> Scenario {
    Scenario::new("検索ボタンの表示確認").step(
        Step::expect(
            search_entry_chain(),
            [ElementPredicate::Visible, ElementPredicate::Enabled],
        )
        .with_timeout(VISIBLE_TIMEOUT),
    )
}

pub fn search_modal_open_close(platform: Platform) -> Scenario {
    Scenario::new("検索モーダルの開閉")
        .steps(open_search(platform))
        .step(Step::press(Key::Escape))
        .step(
            Step::expect(search_input(), [ElementPredicate::Hidden]).with_timeout(VISIBLE_TIMEOUT),
        )
}

pub fn keyboard_shortcut(platform: Platform) -> Scenario {
    Scenario::new("キーボードショートカット (Cmd/Ctrl+K) の動作")
        .step(Step::shortcut(Key::Char('k'), platform))
        .step(
            Step::expect(
                search_input(),
                [ElementPredicate::Visible, ElementPredicate::Focused],
            )
            .with_timeout(VISIBLE_TIMEOUT),
        )
}

pub fn search_installation(platform: Platform) -> Scenario {
    Scenario::new("検索を実行して結果を確認 (Installation)")
        .steps(open_search(platform))
        .step(Step::fill(search_input(), "Installation"))
        .step(Step::press(Key::Enter))
        .step(Step::expect(result_link(), [ElementPredicate::Visible]).with_timeout(RESULT_TIMEOUT))
        .step(Step::click(result_link()))
        .step(Step::wait_for_load_state(LoadState::NetworkIdle))
        .step(
            Step::expect(installation_heading(), [ElementPredicate::Visible])
                .with_timeout(RESULT_TIMEOUT),
        )
}

pub fn homepage_links_to_intro() -> Scenario {
    Scenario::new("homepage has title and links to intro page")
        .step(Step::goto(HOME))
        .step(Step::expect_page(PagePredicate::Title(
            TextMatcher::regex("Playwright").unwrap(),
        )))
        .step(Step::click(Locator::new(Selector::role_named(
            AriaRole::Link,
            TextMatcher::substring("Get started"),
        ))))
        .step(Step::expect_page(PagePredicate::Url(
            TextMatcher::regex(r".*docs\/intro").unwrap(),
        )))
}

/// Every search scenario, with setup, as one suite
pub fn search_suite(platform: Platform) -> Suite {
    Suite::new("Playwright site - Search feature")
        .with_before_each(before_each())
        .scenario(search_button_visible())
        .scenario(search_modal_open_close(platform))
        .scenario(keyboard_shortcut(platform))
        .scenario(search_installation(platform))
}
