/// Implements [`ListItem`](crate::resource::ListItem) and
/// [`Resource`](crate::resource::Resource) for a record struct with an
/// `id: i64` field.
///
/// ```ignore
/// impl_resource!(Category {
///     draft: CategoryDraft,
///     patch: CategoryPatch,
///     schema: CATEGORY_SCHEMA,
///     search: [name],
/// });
/// ```
#[macro_export]
macro_rules! impl_resource {
    ($entity:ty {
        draft: $draft:ty,
        patch: $patch:ty,
        schema: $schema:expr,
        search: [$($field:ident),+ $(,)?] $(,)?
    }) => {
        impl $crate::resource::ListItem for $entity {
            type Id = i64;
            const LABEL: &'static str = $schema.label;

            fn id(&self) -> &i64 {
                &self.id
            }

            fn search_fields(&self) -> Vec<std::borrow::Cow<'_, str>> {
                use $crate::resource::SearchText;
                [$(self.$field.search_text()),+]
                    .into_iter()
                    .flatten()
                    .map(std::borrow::Cow::Borrowed)
                    .collect()
            }
        }

        impl $crate::resource::Resource for $entity {
            type Draft = $draft;
            type Patch = $patch;
            const SCHEMA: $crate::resource::Schema = $schema;
        }
    };
}
