//! Configuration options for building a [`Compiler`].
use std::sync::Arc;

use ahash::AHashMap;

use referencing::{DefaultLoader, Draft, Loader};

use crate::{format::Format, Compiler};

/// Configuration for schema compilation.
///
/// ```rust
/// use conform::Draft;
///
/// let compiler = conform::options()
///     .with_draft(Draft::Draft7)
///     .build();
/// # drop(compiler);
/// ```
#[derive(Clone)]
pub struct CompilerOptions {
    pub(crate) draft: Option<Draft>,
    pub(crate) assert_formats: Option<bool>,
    pub(crate) assert_content: bool,
    pub(crate) validate_schema: bool,
    pub(crate) ignore_unknown_formats: bool,
    pub(crate) loader: Arc<dyn Loader>,
    pub(crate) formats: AHashMap<String, Arc<dyn Format>>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        CompilerOptions {
            draft: None,
            assert_formats: None,
            assert_content: false,
            validate_schema: true,
            ignore_unknown_formats: true,
            loader: Arc::new(DefaultLoader),
            formats: AHashMap::default(),
        }
    }
}

impl CompilerOptions {
    /// Set the default JSON Schema draft.
    ///
    /// Documents declaring a `$schema` keep their declared draft; this
    /// applies to documents that do not.
    #[inline]
    pub fn with_draft(&mut self, draft: Draft) -> &mut Self {
        self.draft = Some(draft);
        self
    }
    /// Control whether `format` is an assertion.
    ///
    /// Defaults to asserting for drafts ≤ 7 and annotating for 2019-09 and
    /// 2020-12, per those specifications.
    pub fn should_assert_formats(&mut self, yes: bool) -> &mut Self {
        self.assert_formats = Some(yes);
        self
    }
    /// Control whether `contentEncoding` / `contentMediaType` /
    /// `contentSchema` assert. Off by default.
    pub fn should_assert_content(&mut self, yes: bool) -> &mut Self {
        self.assert_content = yes;
        self
    }
    /// Skip validating schema documents against their meta-schemas.
    pub fn without_schema_validation(&mut self) -> &mut Self {
        self.validate_schema = false;
        self
    }
    /// Control whether unrecognised `format` values are ignored (default)
    /// or rejected at compile time.
    pub fn should_ignore_unknown_formats(&mut self, yes: bool) -> &mut Self {
        self.ignore_unknown_formats = yes;
        self
    }
    /// Set a loader for resources that are referenced but not added.
    pub fn with_loader(&mut self, loader: impl Loader + 'static) -> &mut Self {
        self.loader = Arc::new(loader);
        self
    }
    /// Register a custom `format` check.
    ///
    /// ```rust
    /// let compiler = conform::options()
    ///     .should_assert_formats(true)
    ///     .with_format("even-length", |value: &str| value.len() % 2 == 0)
    ///     .build();
    /// # drop(compiler);
    /// ```
    pub fn with_format(&mut self, name: impl Into<String>, format: impl Format + 'static) -> &mut Self {
        self.formats.insert(name.into(), Arc::new(format));
        self
    }
    /// Build a [`Compiler`] with these options.
    #[must_use]
    pub fn build(&self) -> Compiler {
        Compiler::with_options(self.clone())
    }

    pub(crate) fn default_draft(&self) -> Draft {
        self.draft.unwrap_or_default()
    }
    /// Whether `format` asserts for a schema declared under `draft`.
    pub(crate) fn validates_formats(&self, draft: Draft) -> bool {
        self.assert_formats
            .unwrap_or(matches!(draft, Draft::Draft4 | Draft::Draft6 | Draft::Draft7))
    }
    pub(crate) fn format(&self, name: &str) -> Option<&Arc<dyn Format>> {
        self.formats.get(name)
    }
}
