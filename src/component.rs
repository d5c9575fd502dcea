use crate::driver::{Driver, ElementHandle, Scope};
use crate::frames::FrameContext;
use crate::handlers::ComponentKind;
use crate::locator::Recognition;
use crate::{Error, Result};

/// A resolved element wrapped for one component kind.
///
/// Remembers the frame and scope it was found in so a cached copy can be
/// re-resolved after the page re-renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub kind: ComponentKind,
    pub element: ElementHandle,
    pub frame: FrameContext,
    pub scope: Scope,
    /// Structured locator that found the element, if one did.
    pub hint: Option<Recognition>,
    pub tag: String,
    pub id: Option<String>,
}

impl Component {
    /// Wrap `element`, failing with [`Error::WrapFailure`] when the node is
    /// stale or the driver cannot describe it.
    pub async fn wrap<D: Driver>(
        driver: &D,
        kind: ComponentKind,
        element: ElementHandle,
        frame: FrameContext,
        scope: Scope,
        hint: Option<Recognition>,
    ) -> Result<Self> {
        let wrap_err = |e: Error| Error::WrapFailure(format!("{}: {}", element, e));

        if driver.is_stale(&element).await.map_err(wrap_err)? {
            return Err(Error::WrapFailure(format!("{} is stale", element)));
        }
        let tag = driver.tag_name(&element).await.map_err(wrap_err)?;
        let id = driver
            .attribute(&element, "id")
            .await
            .map_err(wrap_err)?
            .filter(|id| !id.is_empty());

        Ok(Self {
            kind,
            element,
            frame,
            scope,
            hint,
            tag,
            id,
        })
    }

    /// Short description for log lines.
    pub fn identity(&self) -> String {
        match self.id {
            Some(ref id) => format!("{} <{} id=\"{}\">", self.kind, self.tag, id),
            None => format!("{} <{}> {}", self.kind, self.tag, self.element),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::FramePath;
    use crate::mock::{handle, MockDom};

    #[tokio::test]
    async fn test_wrap() {
        let mut dom = MockDom::new();
        let body = dom.body(0);
        let btn = dom.add(body, "button", &[("id", "go")], "Go");
        let driver = dom.into_driver();

        let c = Component::wrap(
            &driver,
            ComponentKind::Button,
            handle(btn),
            FramePath::top(),
            Scope::Root,
            None,
        )
        .await
        .unwrap();
        assert_eq!(c.tag, "button");
        assert_eq!(c.id.as_deref(), Some("go"));
        assert_eq!(c.identity(), "Button <button id=\"go\">");
    }

    #[tokio::test]
    async fn test_wrap_keeps_any_tag() {
        let mut dom = MockDom::new();
        let body = dom.body(0);
        let div = dom.add(body, "div", &[], "Save");
        let driver = dom.into_driver();

        let c = Component::wrap(
            &driver,
            ComponentKind::CheckBox,
            handle(div),
            FramePath::top(),
            Scope::Root,
            None,
        )
        .await
        .unwrap();
        assert_eq!(c.kind, ComponentKind::CheckBox);
        assert_eq!(c.tag, "div");
        assert!(c.id.is_none());
    }

    #[tokio::test]
    async fn test_wrap_stale_fails() {
        let mut dom = MockDom::new();
        let body = dom.body(0);
        let zombie = dom.add(body, "button", &[], "Go");
        dom.set_zombie(zombie);
        let gone = dom.add(body, "button", &[], "Gone");
        let driver = dom.into_driver();
        driver.detach(gone);

        for n in [zombie, gone] {
            let err = Component::wrap(
                &driver,
                ComponentKind::Button,
                handle(n),
                FramePath::top(),
                Scope::Root,
                None,
            )
            .await
            .unwrap_err();
            assert!(matches!(err, Error::WrapFailure(_)));
        }
    }
}
