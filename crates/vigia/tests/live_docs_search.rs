//! Search scenarios against the real playwright.dev in Chromium.
//!
//! Needs network access and a Chromium install, so every test is ignored by
//! default:
//!
//! ```text
//! cargo test -p vigia --features browser --test live_docs_search -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use vigia::driver::ChromiumBrowser;
use vigia::prelude::*;

fn live_config() -> HarnessConfig {
    // CI containers run as root without a user namespace
    HarnessConfig::load(None)
        .expect("valid VIGIA_* environment")
        .with_sandbox(false)
        .with_screenshot_on_failure(true)
}

#[tokio::test]
#[ignore = "requires chromium and network access"]
async fn live_search_suite() {
    vigia::init_tracing();
    let config = live_config();
    let browser = ChromiumBrowser::launch(&config).await.unwrap();

    let results = common::search_suite(Platform::current())
        .run(&browser, &config)
        .await
        .unwrap();
    browser.close().await.unwrap();

    println!("{results}");
    assert!(results.all_passed(), "{}", results.to_json().unwrap());
}

#[tokio::test]
#[ignore = "requires chromium and network access"]
async fn live_homepage_links_to_intro() {
    vigia::init_tracing();
    let config = live_config();
    let browser = ChromiumBrowser::launch(&config).await.unwrap();
    let page = Page::new(std::sync::Arc::new(browser.open().await.unwrap()), config);

    let outcome = ScenarioRunner::new()
        .run(&page, &common::homepage_links_to_intro())
        .await;
    page.close().await.unwrap();
    browser.close().await.unwrap();

    outcome.into_result().unwrap();
}

#[tokio::test]
#[ignore = "requires chromium and network access"]
async fn live_script_suite() {
    vigia::init_tracing();
    let config = live_config();
    let browser = ChromiumBrowser::launch(&config).await.unwrap();

    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios/docs_search.yaml");
    let results = Suite::from_file(path)
        .unwrap()
        .run(&browser, &config)
        .await
        .unwrap();
    browser.close().await.unwrap();

    println!("{results}");
    results.into_result().unwrap();
}
