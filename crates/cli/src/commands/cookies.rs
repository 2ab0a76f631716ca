//! Cookie jar inspection.

use std::path::Path;

use anyhow::{Context, Result};
use fanbridge_protocol::CookieJar;

pub fn show(file: &Path) -> Result<()> {
    let jar = CookieJar::from_file(file)
        .with_context(|| format!("loading cookie jar from {}", file.display()))?;

    println!("Cookie jar: {}", file.display());
    println!();
    println!("COOKIES ({}):", jar.len());
    if jar.is_empty() {
        println!("  (none)");
        return Ok(());
    }

    println!("  {:<24} {:<30} {:<12}", "NAME", "DOMAIN", "EXPIRES");
    println!("  {}", "-".repeat(66));
    for cookie in &jar.cookies {
        let domain = cookie.domain.as_deref().unwrap_or("-");
        println!(
            "  {:<24} {:<30} {:<12}",
            cookie.name,
            domain,
            format_expiry(cookie.expires)
        );
    }
    Ok(())
}

fn format_expiry(expires: Option<f64>) -> String {
    let ts = match expires {
        None => return "session".into(),
        Some(ts) if ts < 0.0 => return "session".into(),
        Some(ts) => ts as i64,
    };

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    if ts < now {
        return "expired".into();
    }

    match ts - now {
        d if d < 3600 => format!("{}m", d / 60),
        d if d < 86400 => format!("{}h", d / 3600),
        d => format!("{}d", d / 86400),
    }
}
