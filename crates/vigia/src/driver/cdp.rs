//! Chromium over the DevTools protocol.
//!
//! Element identity is a numeric id stamped onto DOM nodes the first time a
//! snapshot or query sees them, so ids stay stable for the life of a
//! document.
//!
//! Every page opens in its own browser context, so cookies, storage and
//! cache never leak from one scenario into the next.

use super::{PageDriver, PageSource};
use crate::config::HarnessConfig;
use crate::dom::{DomSnapshot, NodeId};
use crate::keyboard::{Key, KeyChord};
use crate::result::{VigiaError, VigiaResult};
use crate::wait::{LoadState, NETWORK_IDLE_THRESHOLD_MS};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, InsertTextParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    BrowserContextId, CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::layout::Point;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

const LOAD_POLL: Duration = Duration::from_millis(50);

// Shared helpers for every injected script
const PRELUDE: &str = r"
    if (window.__vigiaNextId === undefined) { window.__vigiaNextId = 1; }
    const idOf = (el) => {
        if (el.__vigiaId === undefined) { el.__vigiaId = window.__vigiaNextId++; }
        return el.__vigiaId;
    };
    const byId = (id) => [...document.querySelectorAll('body *')].find((e) => e.__vigiaId === id);
";

const SNAPSHOT: &str = r"
    const textOfIds = (ids) => ids.split(/\s+/)
        .map((id) => document.getElementById(id))
        .filter(Boolean)
        .map((e) => e.textContent)
        .join(' ');
    const elements = [...document.querySelectorAll('body *')].map((el) => {
        const style = getComputedStyle(el);
        const rect = el.getBoundingClientRect();
        const rendered = el.getClientRects().length > 0 && style.visibility !== 'hidden';
        const parent = el.parentElement && el.parentElement !== document.body
            ? idOf(el.parentElement) : null;
        const labels = el.labels ? [...el.labels].map((l) => l.innerText).join(' ') : '';
        const labelledBy = el.getAttribute('aria-labelledby');
        return {
            node: idOf(el),
            parent,
            tag: el.tagName.toLowerCase(),
            attributes: Object.fromEntries([...el.attributes].map((a) => [a.name, a.value])),
            text: (rendered ? el.innerText : el.textContent) || '',
            label_text: labels || null,
            labelled_by_text: labelledBy ? textOfIds(labelledBy) : null,
            rendered,
            visible: rendered && rect.width > 0 && rect.height > 0,
            disabled: el.disabled === true || el.getAttribute('aria-disabled') === 'true',
            focused: document.activeElement === el,
            value: typeof el.value === 'string' ? el.value : null,
        };
    });
    return JSON.stringify({ url: location.href, title: document.title, elements });
";

fn script(body: &str) -> String {
    format!("(() => {{ {PRELUDE} {body} }})()")
}

fn page_error(e: impl std::fmt::Display) -> VigiaError {
    VigiaError::page(e.to_string())
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Reply<T> {
    Failed { error: String },
    Done(T),
}

#[derive(Debug, Deserialize)]
struct Center {
    x: f64,
    y: f64,
}

// =============================================================================
// BROWSER
// =============================================================================

/// A launched Chromium process
#[derive(Debug)]
pub struct ChromiumBrowser {
    inner: Arc<Mutex<Browser>>,
    handle: tokio::task::JoinHandle<()>,
}

impl ChromiumBrowser {
    /// Launch Chromium with the harness settings
    pub async fn launch(config: &HarnessConfig) -> VigiaResult<Self> {
        let mut builder =
            BrowserConfig::builder().window_size(config.viewport_width, config.viewport_height);

        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|message| VigiaError::BrowserLaunchError { message })?;

        let (browser, mut handler) =
            Browser::launch(cdp_config)
                .await
                .map_err(|e| VigiaError::BrowserLaunchError {
                    message: e.to_string(),
                })?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });
        debug!(headless = config.headless, "chromium launched");

        Ok(Self {
            inner: Arc::new(Mutex::new(browser)),
            handle,
        })
    }

    /// Open a blank page in a fresh browser context
    pub async fn open(&self) -> VigiaResult<CdpPage> {
        let browser = self.inner.lock().await;
        let context = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(page_error)?;
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(VigiaError::page)?;
        let page = match browser.new_page(target).await {
            Ok(page) => page,
            Err(e) => {
                if let Err(dispose) = browser.dispose_browser_context(context).await {
                    debug!(error = %dispose, "browser context not disposed");
                }
                return Err(page_error(e));
            }
        };
        debug!(context = ?context, "page opened");
        Ok(CdpPage {
            page,
            context,
            browser: Arc::clone(&self.inner),
        })
    }

    /// Shut the browser down
    pub async fn close(self) -> VigiaResult<()> {
        let mut browser = self.inner.lock().await;
        browser
            .close()
            .await
            .map_err(|e| VigiaError::BrowserLaunchError {
                message: e.to_string(),
            })?;
        self.handle.abort();
        Ok(())
    }
}

#[async_trait]
impl PageSource for ChromiumBrowser {
    async fn new_page(&self) -> VigiaResult<Arc<dyn PageDriver>> {
        Ok(Arc::new(self.open().await?))
    }
}

// =============================================================================
// PAGE
// =============================================================================

/// One Chromium tab and the browser context it owns
#[derive(Debug)]
pub struct CdpPage {
    page: Page,
    context: BrowserContextId,
    browser: Arc<Mutex<Browser>>,
}

impl CdpPage {
    async fn eval<T: DeserializeOwned>(&self, body: &str) -> VigiaResult<T> {
        let raw: String = self
            .page
            .evaluate(script(body))
            .await
            .map_err(page_error)?
            .into_value()
            .map_err(page_error)?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn eval_value<T: DeserializeOwned>(&self, expression: &str) -> VigiaResult<T> {
        self.page
            .evaluate(expression)
            .await
            .map_err(page_error)?
            .into_value()
            .map_err(page_error)
    }

    async fn act<T: DeserializeOwned>(&self, action: &str, node: NodeId, body: &str) -> VigiaResult<T> {
        let lookup = format!(
            "const el = byId({id}); \
             if (!el || !el.isConnected) {{ return JSON.stringify({{ error: 'element is detached from the document' }}); }} \
             {body}",
            id = node.0
        );
        match self.eval::<Reply<T>>(&lookup).await? {
            Reply::Done(value) => Ok(value),
            Reply::Failed { error } => Err(VigiaError::action(action, node.to_string(), error)),
        }
    }

    async fn key_event(
        &self,
        kind: DispatchKeyEventType,
        key: Key,
        modifiers: i64,
        text: Option<String>,
    ) -> VigiaResult<()> {
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind)
            .modifiers(modifiers)
            .key(key.key())
            .code(key.code())
            .windows_virtual_key_code(key.virtual_key_code())
            .native_virtual_key_code(key.virtual_key_code());
        if let Some(text) = text {
            builder = builder.text(text);
        }
        let params = builder
            .build()
            .map_err(|message| VigiaError::action("press", key.to_string(), message))?;
        self.page.execute(params).await.map_err(page_error)?;
        Ok(())
    }

    async fn ready_state(&self) -> VigiaResult<(String, u64)> {
        self.eval_value(
            "[document.readyState, performance.getEntriesByType('resource').length]",
        )
        .await
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn goto(&self, url: &str) -> VigiaResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| VigiaError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> VigiaResult<()> {
        let start = Instant::now();
        let idle = Duration::from_millis(NETWORK_IDLE_THRESHOLD_MS);
        let mut resources: Option<(u64, Instant)> = None;
        loop {
            let (ready, count) = self.ready_state().await?;
            let reached = match state {
                LoadState::DomContentLoaded => ready != "loading",
                LoadState::Load => ready == "complete",
                LoadState::NetworkIdle => {
                    let now = Instant::now();
                    let stable_since = match resources {
                        Some((seen, since)) if seen == count => since,
                        _ => now,
                    };
                    resources = Some((count, stable_since));
                    ready == "complete" && now.duration_since(stable_since) >= idle
                }
            };
            if reached {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(VigiaError::LoadStateTimeout {
                    state: state.event_name().to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            sleep(LOAD_POLL).await;
        }
    }

    async fn snapshot(&self) -> VigiaResult<DomSnapshot> {
        self.eval(SNAPSHOT).await
    }

    async fn query_css(&self, css: &str) -> VigiaResult<Vec<NodeId>> {
        let literal = serde_json::to_string(css)?;
        let body = format!(
            "try {{ return JSON.stringify([...document.querySelectorAll({literal})].map(idOf)); }} \
             catch (e) {{ return JSON.stringify({{ error: String(e) }}); }}"
        );
        match self.eval::<Reply<Vec<u64>>>(&body).await? {
            Reply::Done(ids) => Ok(ids.into_iter().map(NodeId).collect()),
            Reply::Failed { error } => Err(VigiaError::InvalidSelector {
                selector: css.to_string(),
                message: error,
            }),
        }
    }

    async fn click(&self, node: NodeId) -> VigiaResult<()> {
        let center: Center = self
            .act(
                "click",
                node,
                "el.scrollIntoView({ block: 'center', inline: 'center' }); \
                 const r = el.getBoundingClientRect(); \
                 if (r.width === 0 || r.height === 0) { return JSON.stringify({ error: 'element is not visible' }); } \
                 return JSON.stringify({ x: r.left + r.width / 2, y: r.top + r.height / 2 });",
            )
            .await?;
        self.page
            .click(Point {
                x: center.x,
                y: center.y,
            })
            .await
            .map_err(|e| VigiaError::action("click", node.to_string(), e.to_string()))?;
        Ok(())
    }

    async fn fill(&self, node: NodeId, text: &str) -> VigiaResult<()> {
        let _: bool = self
            .act(
                "fill",
                node,
                "const editable = el.isContentEditable || el.tagName === 'TEXTAREA' || \
                     (el.tagName === 'INPUT' && !['button', 'checkbox', 'radio', 'submit', 'reset', 'image', 'file'].includes(el.type)); \
                 if (!editable) { return JSON.stringify({ error: 'element is not an <input>, <textarea> or [contenteditable]' }); } \
                 if (el.disabled) { return JSON.stringify({ error: 'element is disabled' }); } \
                 el.focus(); \
                 if (el.isContentEditable) { el.textContent = ''; } else { el.value = ''; } \
                 el.dispatchEvent(new Event('input', { bubbles: true })); \
                 return JSON.stringify(true);",
            )
            .await?;
        if !text.is_empty() {
            self.page
                .execute(InsertTextParams::new(text))
                .await
                .map_err(|e| VigiaError::action("fill", node.to_string(), e.to_string()))?;
        }
        Ok(())
    }

    async fn press(&self, chord: &KeyChord) -> VigiaResult<()> {
        let mut held = 0;
        for modifier in chord.modifiers() {
            held |= modifier.modifier_bit();
            self.key_event(DispatchKeyEventType::RawKeyDown, *modifier, held, None)
                .await?;
        }

        let key = chord.key();
        let text = if chord.has_command_modifier() {
            None
        } else {
            key.text()
        };
        let down = if text.is_some() {
            DispatchKeyEventType::KeyDown
        } else {
            DispatchKeyEventType::RawKeyDown
        };
        self.key_event(down, key, held, text).await?;
        self.key_event(DispatchKeyEventType::KeyUp, key, held, None)
            .await?;

        for modifier in chord.modifiers().iter().rev() {
            held &= !modifier.modifier_bit();
            self.key_event(DispatchKeyEventType::KeyUp, *modifier, held, None)
                .await?;
        }
        Ok(())
    }

    async fn url(&self) -> VigiaResult<String> {
        self.eval_value("location.href").await
    }

    async fn title(&self) -> VigiaResult<String> {
        self.eval_value("document.title").await
    }

    async fn screenshot(&self) -> VigiaResult<Vec<u8>> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = self.page.execute(params).await.map_err(page_error)?;

        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(page_error)
    }

    async fn close(&self) -> VigiaResult<()> {
        self.page.clone().close().await.map_err(page_error)?;
        self.browser
            .lock()
            .await
            .dispose_browser_context(self.context.clone())
            .await
            .map_err(page_error)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://playwright.dev/";
    const STORE: &str = "(localStorage.setItem('vigia', '1'), document.cookie = 'vigia=1', true)";
    const IS_CLEAN: &str =
        "localStorage.getItem('vigia') === null && !document.cookie.includes('vigia=1')";

    #[tokio::test]
    #[ignore = "requires chromium and network access"]
    async fn test_pages_do_not_share_storage() {
        let config = HarnessConfig::load(None).unwrap().with_sandbox(false);
        let browser = ChromiumBrowser::launch(&config).await.unwrap();

        let first = browser.open().await.unwrap();
        first.goto(ORIGIN).await.unwrap();
        let stored: bool = first.eval_value(STORE).await.unwrap();
        assert!(stored);

        let second = browser.open().await.unwrap();
        second.goto(ORIGIN).await.unwrap();
        let clean: bool = second.eval_value(IS_CLEAN).await.unwrap();
        assert!(clean);
        assert_ne!(first.context, second.context);

        first.close().await.unwrap();
        second.close().await.unwrap();
        browser.close().await.unwrap();
    }
}
