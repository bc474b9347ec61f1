//! Detector functions.
//!
//! A detector is a pure lookup over a [`BrowserWindow`] snapshot: no side
//! effects, safe to call on every discovery pass. Wallets take their
//! detectors at construction, so tests can substitute their own.

use std::sync::Arc;
use url::Url;
use wmux_dot::PolkadotExtension;
use wmux_evm::{Eip1193Provider, ProviderFlags};
use wmux_svm::SolanaWallet;

use crate::env::BrowserWindow;

/// Finds a wallet's EIP-1193 object.
pub type EvmDetector =
    Arc<dyn Fn(&BrowserWindow) -> Option<Arc<dyn Eip1193Provider>> + Send + Sync>;

/// Finds a wallet's Solana object.
pub type SolanaDetector =
    Arc<dyn Fn(&BrowserWindow) -> Option<Arc<dyn SolanaWallet>> + Send + Sync>;

/// Finds a wallet's Polkadot extension.
pub type PolkadotDetector =
    Arc<dyn Fn(&BrowserWindow) -> Option<Arc<dyn PolkadotExtension>> + Send + Sync>;

/// Returns the first EIP-1193 object whose flags satisfy `accept`,
/// searching `window.ethereum.providers` before `window.ethereum`.
pub fn find_ethereum(
    window: &BrowserWindow,
    accept: impl Fn(&ProviderFlags) -> bool,
) -> Option<Arc<dyn Eip1193Provider>> {
    window
        .ethereum_candidates()
        .find(|provider| accept(&provider.flags()))
        .cloned()
}

/// Returns `window.injectedWeb3[name]`.
#[must_use]
pub fn injected_web3(window: &BrowserWindow, name: &str) -> Option<Arc<dyn PolkadotExtension>> {
    window.injected_web3.get(name).cloned()
}

/// Returns `true` when the page runs as a Safe App.
///
/// The page must be framed. Where the browser exposes ancestor origins, one
/// of them must be an allowed Safe origin; otherwise the referrer is checked
/// the same way. With neither available, being framed is accepted.
#[must_use]
pub fn is_safe_context(window: &BrowserWindow, allowed_origins: &[String]) -> bool {
    let frame = &window.frame;
    if !frame.is_framed {
        return false;
    }
    if let Some(ancestors) = frame.ancestor_origins.as_ref().filter(|a| !a.is_empty()) {
        return ancestors
            .iter()
            .any(|origin| is_safe_origin(origin, allowed_origins));
    }
    match frame.referrer.as_deref().filter(|r| !r.is_empty()) {
        Some(referrer) => is_safe_origin(referrer, allowed_origins),
        None => true,
    }
}

/// Returns `true` if `url` belongs to an allowed origin or any
/// `*.safe.global` host over https. Unparseable URLs are rejected.
fn is_safe_origin(url: &str, allowed_origins: &[String]) -> bool {
    let Ok(url) = Url::parse(url.trim()) else {
        return false;
    };
    let origin = url.origin();
    if allowed_origins
        .iter()
        .filter_map(|allowed| Url::parse(allowed.trim()).ok())
        .any(|allowed| allowed.origin() == origin)
    {
        return true;
    }
    url.scheme() == "https"
        && url
            .host_str()
            .is_some_and(|host| host.ends_with(".safe.global"))
}

/// Returns `true` if the browser can reach a hardware wallet.
#[must_use]
pub const fn has_hardware_transport(window: &BrowserWindow) -> bool {
    window.transports.webusb || window.transports.webbluetooth
}

#[cfg(test)]
mod tests {
    use super::*;
    use wmux_evm::testing::MockEip1193;

    fn origins() -> Vec<String> {
        vec!["https://app.safe.global".to_owned(), "https://safe.global".to_owned()]
    }

    #[test]
    fn test_unframed_page_is_never_safe() {
        let window = BrowserWindow::new();
        assert!(!is_safe_context(&window, &origins()));
    }

    #[test]
    fn test_ancestor_origins_decide_when_exposed() {
        let safe = BrowserWindow::new()
            .framed(Some(vec!["https://app.safe.global".to_owned()]), None);
        assert!(is_safe_context(&safe, &origins()));

        let other = BrowserWindow::new().framed(
            Some(vec!["https://evil.example".to_owned()]),
            Some("https://app.safe.global/home".to_owned()),
        );
        assert!(!is_safe_context(&other, &origins()));

        let subdomain = BrowserWindow::new()
            .framed(Some(vec!["https://eth.safe.global".to_owned()]), None);
        assert!(is_safe_context(&subdomain, &origins()));
    }

    #[test]
    fn test_referrer_fallback() {
        let safe = BrowserWindow::new()
            .framed(None, Some("https://app.safe.global/apps?safe=eth:0x1".to_owned()));
        assert!(is_safe_context(&safe, &origins()));

        let other = BrowserWindow::new().framed(None, Some("https://notsafe.global/".to_owned()));
        assert!(!is_safe_context(&other, &origins()));

        let bare = BrowserWindow::new().framed(None, None);
        assert!(is_safe_context(&bare, &origins()));
    }

    #[test]
    fn test_backslash_does_not_smuggle_a_host() {
        let referrer = BrowserWindow::new()
            .framed(None, Some("https://evil.com\\.safe.global/".to_owned()));
        assert!(!is_safe_context(&referrer, &[]));

        let ancestor = BrowserWindow::new()
            .framed(Some(vec!["https://evil.com\\.safe.global".to_owned()]), None);
        assert!(!is_safe_context(&ancestor, &origins()));
    }

    #[test]
    fn test_default_port_and_case_are_normalised() {
        let explicit = BrowserWindow::new()
            .framed(Some(vec!["https://app.safe.global:443".to_owned()]), None);
        assert!(is_safe_context(&explicit, &origins()));

        let upper = BrowserWindow::new()
            .framed(None, Some("https://APP.Safe.Global/apps".to_owned()));
        assert!(is_safe_context(&upper, &origins()));

        let plain_http = BrowserWindow::new()
            .framed(None, Some("http://eth.safe.global/".to_owned()));
        assert!(!is_safe_context(&plain_http, &origins()));

        let garbage = BrowserWindow::new().framed(None, Some("not a url".to_owned()));
        assert!(!is_safe_context(&garbage, &origins()));
    }

    #[test]
    fn test_find_ethereum_prefers_providers_list() {
        let flags = ProviderFlags {
            is_meta_mask: true,
            ..ProviderFlags::default()
        };
        let listed: Arc<dyn Eip1193Provider> = Arc::new(MockEip1193::new().with_flags(flags));
        let primary: Arc<dyn Eip1193Provider> = Arc::new(MockEip1193::new().with_flags(flags));
        let window = BrowserWindow::new()
            .with_ethereum(Arc::clone(&primary))
            .with_ethereum_provider(Arc::clone(&listed));
        let found = find_ethereum(&window, |f| f.is_meta_mask).unwrap();
        assert!(Arc::ptr_eq(&found, &listed));
    }

    #[test]
    fn test_hardware_transport() {
        assert!(!has_hardware_transport(&BrowserWindow::new()));
        assert!(has_hardware_transport(&BrowserWindow::new().with_transports(false, true)));
    }
}
