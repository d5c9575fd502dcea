//! Resolved-component cache keyed by criterion fingerprint.

use crate::component::Component;
use crate::criteria::{CriterionSpec, Fingerprint};
use crate::driver::Driver;
use crate::frames::FrameContext;
use crate::search::ElementLocator;
use crate::settings::Settings;
use crate::Result;
use std::collections::HashMap;
use tracing::debug;

/// One cached resolution.
#[derive(Debug, Clone)]
pub struct CachedComponent {
    pub fingerprint: Fingerprint,
    pub component: Component,
}

/// Maps criterion fingerprints to the components they resolved to.
///
/// Only consulted while [`Settings::use_cache`] is on. Turning the cache off
/// through the session clears it.
#[derive(Debug, Default)]
pub struct ComponentCache {
    entries: HashMap<Fingerprint, CachedComponent>,
}

impl ComponentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A live component for `spec`, or `None` on a miss.
    ///
    /// A stale entry is re-resolved through its structured locator inside
    /// the frame and scope it was found in; if that fails the entry is
    /// evicted. On a hit the driver is left in the component's frame; on a
    /// miss or an error it is back in `current`.
    pub async fn lookup<D: Driver>(
        &mut self,
        driver: &D,
        settings: &Settings,
        spec: &CriterionSpec,
        current: &FrameContext,
    ) -> Result<Option<Component>> {
        if !settings.use_cache {
            return Ok(None);
        }
        let key = spec.fingerprint();
        let Some(entry) = self.entries.get(&key) else {
            return Ok(None);
        };
        let cached = entry.component.clone();

        let found = self.revalidate(driver, settings, key, &cached).await;
        if !matches!(found, Ok(Some(_))) && cached.frame != *current {
            debug!("cache miss, back to frame {}", current);
            driver.reset_frame_context(current).await?;
        }
        found
    }

    async fn revalidate<D: Driver>(
        &mut self,
        driver: &D,
        settings: &Settings,
        key: Fingerprint,
        cached: &Component,
    ) -> Result<Option<Component>> {
        driver.reset_frame_context(&cached.frame).await?;
        if !driver.is_stale(&cached.element).await? {
            debug!("cache hit for '{}'", key);
            return Ok(Some(cached.clone()));
        }

        match refresh(driver, settings, cached).await {
            Some(component) => {
                debug!("refreshed stale cache entry '{}'", key);
                self.entries.insert(
                    key.clone(),
                    CachedComponent {
                        fingerprint: key,
                        component: component.clone(),
                    },
                );
                Ok(Some(component))
            }
            None => {
                debug!("evicting stale cache entry '{}'", key);
                self.entries.remove(&key);
                Ok(None)
            }
        }
    }

    /// Remember `component` for `spec` when caching is on.
    pub fn store(&mut self, settings: &Settings, spec: &CriterionSpec, component: &Component) {
        if !settings.use_cache {
            return;
        }
        let fingerprint = spec.fingerprint();
        self.entries.insert(
            fingerprint.clone(),
            CachedComponent {
                fingerprint,
                component: component.clone(),
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

async fn refresh<D: Driver>(driver: &D, settings: &Settings, stale: &Component) -> Option<Component> {
    let hint = stale.hint.as_ref()?;
    let found = ElementLocator::new(driver, settings)
        .query_segments(&stale.scope, &hint.segments)
        .await
        .ok()?;
    let element = found.into_iter().next()?;
    Component::wrap(
        driver,
        stale.kind,
        element,
        stale.frame.clone(),
        stale.scope.clone(),
        Some(hint.clone()),
    )
    .await
    .ok()
}
