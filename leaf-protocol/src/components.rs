//! Built-in components.
//!
//! Names and specification texts are part of each schema id, so they must
//! not change.

use chrono::{DateTime, Utc};
use leaf_types::Link;
use borsh::{BorshDeserialize, BorshSerialize};

use crate::component::{AnyComponent, Component, ComponentType};
use crate::format::{Format, HasFormat};

const NAME_SPEC: &str = "The primary, human readable name associated to an Entity.";

const COMMONMARK_SPEC: &str = "See CommonMark specification at https://spec.commonmark.org/0.31.2/";

const DESCRIPTION_SPEC: &str = r#"A description of an Entity. Usually this is a short description, but there is no hard limit on length. Longer descriptions may be truncated for display by some clients if it exceeds a preferred length.

The description is often used for things like link-previews or search-engine metadata.

Non-normative examples:

- The description for a chat message might be the entire chat message, or the first line of the message, or the first 300 characters with an ellipsis at the end.
- The description of a blog post might be the first paragraph of the post, or a specifically written description by the author.
- The description for a microblog post would likely be the entire microblog message."#;

const DATE_CREATED_SPEC: &str = "The time that the entity or what it represents was created.";

const DATE_UPDATED_SPEC: &str = "The time that the entity or what it represents was updated.";

const REPLY_TO_SPEC: &str = r#"Indicates a reply to some other entity.

For example, it might be used for:

- chat message replies
- comments on blog posts
- threaded forum topic discussions"#;

const EMBED_SPEC: &str = r#"Links to another entity that is meant to be embedded in this one.

In many cases an entity with an `Embed` component will render similar to the entity that is embedded in it. The entity with the `Embed` component may still have other components, though, such as it's own `Name` or `Description` that should take precedence over the embedded component if present, and may warrant other changes in rendering to create a larger distinction between itself and the embedded entity.

Embed could be useful for:

- Adding an entity created by another author to your own digital garden or curated collection.
- Adding an entity created by another other on your own Kanban board, where you can move it between columns by adding your own components to it, without editing the original author's entity.
- Adding embedded entities to rich text using facets."#;

const RAW_IMAGE_SPEC: &str = r#"A raw image associated with the entity. This component should be modified later to contain a size field and a lazy-loadable blob id instead of inline image data.

The `Image` component usually represents the "feature image", icon, avatar, or other primary image associated to the entity. This image would often be displayed in link previews.

The `Image` component might also be used for an entity that is primarily an image, such as an image file in an image in an image gallery.

Multiple `Image` components may be added to an entity when there are multiple formats or sizes available for the same image. This can be useful, for example, to allow using a smaller image for a link preview than you would use when displaying a full-sized feature image on a blog post.

In most cases, multiple distinct images should be stored in separate entities or a different component."#;

/// Every built-in component type.
pub fn standard_components() -> Vec<ComponentType> {
    vec![
        ComponentType::of::<Utf8>(),
        ComponentType::of::<Name>(),
        ComponentType::of::<CommonMark>(),
        ComponentType::of::<Description>(),
        ComponentType::of::<DateCreated>(),
        ComponentType::of::<DateUpdated>(),
        ComponentType::of::<ReplyTo>(),
        ComponentType::of::<Embed>(),
        ComponentType::of::<RawImage>(),
    ]
}

/// Plain UTF-8 text. The base of most other specifications.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Utf8(pub String);

impl HasFormat for Utf8 {
    fn format() -> Format {
        Format::String
    }
}

impl Component for Utf8 {
    const NAME: &'static str = "UTF-8";
}

impl From<&str> for Utf8 {
    fn from(text: &str) -> Self {
        Utf8(text.to_string())
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(pub String);

impl HasFormat for Name {
    fn format() -> Format {
        Format::String
    }
}

impl Component for Name {
    const NAME: &'static str = "Name";

    fn specification() -> Vec<AnyComponent> {
        vec![Utf8::from(NAME_SPEC).into()]
    }
}

/// CommonMark formatted text.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommonMark(pub String);

impl HasFormat for CommonMark {
    fn format() -> Format {
        Format::String
    }
}

impl Component for CommonMark {
    const NAME: &'static str = "CommonMark";

    fn specification() -> Vec<AnyComponent> {
        vec![Utf8::from(COMMONMARK_SPEC).into()]
    }
}

impl From<&str> for CommonMark {
    fn from(text: &str) -> Self {
        CommonMark(text.to_string())
    }
}

/// A short CommonMark description of an entity.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Description(pub String);

impl HasFormat for Description {
    fn format() -> Format {
        Format::String
    }
}

impl Component for Description {
    const NAME: &'static str = "Description";

    fn specification() -> Vec<AnyComponent> {
        vec![CommonMark::from(DESCRIPTION_SPEC).into()]
    }
}

/// Seconds since the Unix epoch.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateCreated(pub u64);

impl DateCreated {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(date: DateTime<Utc>) -> Self {
        DateCreated(unix_seconds(date))
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        from_unix_seconds(self.0)
    }
}

impl HasFormat for DateCreated {
    fn format() -> Format {
        Format::U64
    }
}

impl Component for DateCreated {
    const NAME: &'static str = "DateCreated";

    fn specification() -> Vec<AnyComponent> {
        vec![Utf8::from(DATE_CREATED_SPEC).into()]
    }
}

/// Seconds since the Unix epoch.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateUpdated(pub u64);

impl DateUpdated {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(date: DateTime<Utc>) -> Self {
        DateUpdated(unix_seconds(date))
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        from_unix_seconds(self.0)
    }
}

impl HasFormat for DateUpdated {
    fn format() -> Format {
        Format::U64
    }
}

impl Component for DateUpdated {
    const NAME: &'static str = "DateUpdated";

    fn specification() -> Vec<AnyComponent> {
        vec![Utf8::from(DATE_UPDATED_SPEC).into()]
    }
}

fn unix_seconds(date: DateTime<Utc>) -> u64 {
    u64::try_from(date.timestamp()).unwrap_or(0)
}

fn from_unix_seconds(seconds: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(i64::try_from(seconds).ok()?, 0)
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplyTo(pub Link);

impl HasFormat for ReplyTo {
    fn format() -> Format {
        Format::Link
    }
}

impl Component for ReplyTo {
    const NAME: &'static str = "ReplyTo";

    fn specification() -> Vec<AnyComponent> {
        vec![CommonMark::from(REPLY_TO_SPEC).into()]
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Embed(pub Link);

impl HasFormat for Embed {
    fn format() -> Format {
        Format::Link
    }
}

impl Component for Embed {
    const NAME: &'static str = "Embed";

    fn specification() -> Vec<AnyComponent> {
        vec![CommonMark::from(EMBED_SPEC).into()]
    }
}

/// Inline image bytes with their MIME type.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl HasFormat for RawImage {
    fn format() -> Format {
        Format::structure([
            ("mimeType", Format::String),
            ("data", Format::vector(Format::U8)),
        ])
    }
}

impl Component for RawImage {
    const NAME: &'static str = "RawImage";

    fn specification() -> Vec<AnyComponent> {
        vec![CommonMark::from(RAW_IMAGE_SPEC).into()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use leaf_types::ExactLink;

    #[test]
    fn test_text_components_encode_as_strings() {
        let bytes = codec::to_vec(&Name("Leaf".into())).unwrap();
        assert_eq!(bytes, codec::to_vec("Leaf").unwrap());
        assert!(Name::format().validate(&bytes).is_ok());
    }

    #[test]
    fn test_raw_image_layout() {
        let image = RawImage {
            mime_type: "image/png".into(),
            data: vec![0x89, b'P'],
        };
        let bytes = codec::to_vec(&image).unwrap();
        assert!(RawImage::format().validate(&bytes).is_ok());
        assert_eq!(codec::from_slice::<RawImage>(&bytes).unwrap(), image);
    }

    #[test]
    fn test_link_components_validate() {
        let reply = ReplyTo(ExactLink::new([1; 32], [2; 32], ["post", "1"]).into());
        let bytes = codec::to_vec(&reply).unwrap();
        assert!(ReplyTo::format().validate(&bytes).is_ok());
    }

    #[test]
    fn test_dates() {
        let date = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let created = DateCreated::from_datetime(date);
        assert_eq!(created, DateCreated(1_700_000_000));
        assert_eq!(created.to_datetime(), Some(date));
        assert!(DateUpdated::now().0 > 1_700_000_000);
        assert_eq!(DateCreated(u64::MAX).to_datetime(), None);
    }

    #[test]
    fn test_specification_texts() {
        insta::assert_snapshot!(REPLY_TO_SPEC, @r"
        Indicates a reply to some other entity.

        For example, it might be used for:

        - chat message replies
        - comments on blog posts
        - threaded forum topic discussions
        ");
        assert!(DESCRIPTION_SPEC.ends_with("entire microblog message."));
        assert_eq!(standard_components().len(), 9);
    }
}
