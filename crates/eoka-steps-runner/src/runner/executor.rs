use super::StepSession;
use crate::config::Step;
use crate::Result;
use std::collections::HashMap;
use tracing::{debug, info};

/// Execute one step against the session.
///
/// `perform` failures are reported by the session and only stop the run
/// when the session returns them (a missing element while aborting).
/// Directive and page errors always stop it.
pub async fn execute(session: &mut StepSession, step: &Step) -> Result<()> {
    match step {
        Step::Perform(p) => {
            debug!("perform: {}", p);
            session
                .perform_as(
                    p.kind,
                    &p.action,
                    &p.criteria,
                    p.nth,
                    &p.params,
                    p.declared_type.as_deref(),
                )
                .await?;
        }
        Step::Goto(g) => {
            info!("goto: {}", g.url);
            session.driver().page().goto(&g.url).await?;
            session.invalidate().await?;
        }
        Step::Wait(w) => {
            debug!("wait: {}ms", w.ms);
            session.driver().page().wait(w.ms).await;
        }
        Step::Screenshot(s) => {
            let path = session.settings().resolve_output(&s.path);
            info!("screenshot: {}", path.display());
            let data = session.driver().page().screenshot().await?;
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            std::fs::write(&path, data)?;
        }
        Step::Log(l) => {
            info!("[log] {}", expand_variables(&l.message, session.variables()));
        }
        Step::AbortOnNotFound => session.abort_on_not_found(),
        Step::ContinueOnNotFound => session.continue_on_not_found(),
        Step::PartialMatches(on) => session.set_partial_match(*on),
        Step::UseCache(on) => session.set_use_cache(*on),
        Step::LogDetails(on) => session.set_log_details(*on),
        Step::Highlight(on) => session.set_highlight(*on),
        Step::WaitTimeout(secs) => session.set_wait_timeout(*secs).await?,
        Step::FocusFrame(key) => session.focus_frame(key).await?,
        Step::FocusFirstFrame => session.focus_first_frame().await?,
        Step::ReleaseFrame => session.release_frame().await?,
        Step::WindowDisplayed(title) => session.window_displayed(title).await?,
        Step::Assign(a) => session.assign(&a.name, &a.value),
    }
    Ok(())
}

/// Replace `$name` tokens with session variables. Unknown names stay.
fn expand_variables(message: &str, variables: &HashMap<String, String>) -> String {
    let mut names: Vec<&String> = variables.keys().collect();
    // Longest first, so `$ab` is not eaten by `$a`.
    names.sort_by_key(|n| std::cmp::Reverse(n.len()));
    names.into_iter().fold(message.to_string(), |out, name| {
        out.replace(&format!("${}", name), &variables[name])
    })
}
