//! JavaScript evaluated inside crawled pages.

pub const READY_STATE_SCRIPT: &str = r"
    (() => ({
        readyState: document.readyState,
        url: window.location.href
    }))()
";

pub const NAVIGATION_INFO_SCRIPT: &str = r"
    (() => {
        const nav = performance.getEntriesByType('navigation')[0] || {};
        return {
            status: nav.responseStatus || 0,
            redirects: nav.redirectCount || 0,
            url: window.location.href
        };
    })()
";

/// Collects reference-bearing elements in document order and keeps them on
/// `window` so a later call can highlight one of them by index.
pub const CANDIDATES_SCRIPT: &str = r#"
    (() => {
        const nodes = Array.from(document.querySelectorAll(
            'a[href], img[src], link[rel~="stylesheet"][href], script[src]'
        ));
        window.__linkhoundCandidates = nodes;
        return nodes.map(el => ({
            text: (el.innerText || el.textContent || '').trim(),
            alt: el.getAttribute('alt') || el.getAttribute('aria-label') || '',
            href: el.hasAttribute('href') ? el.href : '',
            src: el.hasAttribute('src') ? el.src : ''
        }));
    })()
"#;

pub const HIGHLIGHT_STYLE_SCRIPT: &str = r#"
    (() => {
        document.querySelectorAll('style[data-linkhound]').forEach(s => s.remove());
        document.querySelectorAll('[data-linkhound-banner]').forEach(b => b.remove());
        document.querySelectorAll('.linkhound-broken').forEach(el => el.classList.remove('linkhound-broken'));

        const style = document.createElement('style');
        style.setAttribute('data-linkhound', '1');
        style.textContent = `
            .linkhound-broken {
                outline: 4px solid #ff1744 !important;
                outline-offset: 3px !important;
                background-color: rgba(255, 23, 68, 0.15) !important;
                position: relative !important;
            }
            .linkhound-broken::after {
                content: 'BROKEN LINK';
                position: absolute;
                top: -26px;
                left: 0;
                background: #ff1744;
                color: #ffffff;
                font: bold 12px/1 sans-serif;
                padding: 6px 8px;
                border-radius: 3px;
                white-space: nowrap;
                z-index: 2147483647;
            }
        `;
        (document.head || document.documentElement).appendChild(style);
        return true;
    })()
"#;

pub fn highlight_script(index: usize) -> String {
    format!(
        r"
        (() => {{
            const el = (window.__linkhoundCandidates || [])[{index}];
            if (!el) return false;
            el.classList.add('linkhound-broken');
            el.scrollIntoView({{ block: 'center', inline: 'center' }});
            return true;
        }})()
        "
    )
}

pub fn banner_script(message: &str) -> String {
    let message = serde_json::to_string(message).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r"
        (() => {{
            const banner = document.createElement('div');
            banner.setAttribute('data-linkhound-banner', '1');
            banner.textContent = {message};
            banner.style.cssText = [
                'position: fixed', 'top: 0', 'left: 0', 'right: 0',
                'z-index: 2147483647', 'background: #ff1744', 'color: #ffffff',
                'font: bold 18px/1.4 sans-serif', 'padding: 16px 24px',
                'text-align: center', 'box-shadow: 0 2px 12px rgba(0,0,0,0.4)'
            ].join(';');
            (document.body || document.documentElement).appendChild(banner);
            window.scrollTo(0, 0);
            return true;
        }})()
        "
    )
}
