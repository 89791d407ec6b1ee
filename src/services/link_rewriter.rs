//! Card link rewriting
//!
//! Every URL a client would post an action to is replaced by a proxy URL
//! pointing at a freshly minted child alias. All children hang off the root
//! alias, so the tree is one level deep no matter how many cards follow.

use std::sync::Arc;

use tracing::debug;

use super::AliasRegistry;
use crate::errors::Result;
use crate::frame::Card;
use crate::utils::url_validator::wrap_url;

pub struct LinkRewriter {
    registry: Arc<AliasRegistry>,
}

impl LinkRewriter {
    pub fn new(registry: Arc<AliasRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the rewritten card and the minted ids in minting order:
    /// the card post URL first, then buttons in card order.
    pub async fn rewrite(&self, card: &Card, root_id: &str) -> Result<(Card, Vec<String>)> {
        let mut rewritten = card.clone();
        let mut minted = Vec::new();

        rewritten.post_url = self.wrap(&card.post_url, root_id, &mut minted).await?;

        for button in rewritten.buttons.iter_mut() {
            if !button.action.is_proxied() {
                continue;
            }
            if let Some(target) = button.target.take() {
                button.target = Some(self.wrap(&target, root_id, &mut minted).await?);
            }
            if let Some(post_url) = button.post_url.take() {
                button.post_url = Some(self.wrap(&post_url, root_id, &mut minted).await?);
            }
        }

        debug!("rewrote card under {} with {} aliases", root_id, minted.len());
        Ok((rewritten, minted))
    }

    async fn wrap(&self, url: &str, root_id: &str, minted: &mut Vec<String>) -> Result<String> {
        let child = self.registry.create(url, None).await?;
        let wrapped = wrap_url(self.registry.public_url(), root_id, &child);
        minted.push(child);
        Ok(wrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Button, ButtonAction};
    use crate::storage::MemoryKvStore;

    fn card() -> Card {
        Card {
            version: "vNext".to_string(),
            image: "https://ex.com/img.png".to_string(),
            image_aspect_ratio: None,
            post_url: "https://ex.com/post".to_string(),
            buttons: vec![
                Button::new("Next", ButtonAction::Post),
                Button::new("Docs", ButtonAction::Link).with_target("https://ex.com/docs"),
                Button::new("Pay", ButtonAction::Tx).with_target("https://ex.com/tx"),
                Button::new("Vote", ButtonAction::Post).with_target("https://ex.com/vote"),
            ],
            input_text: None,
            state: None,
            title: None,
            og_image: None,
        }
    }

    fn rewriter() -> (Arc<AliasRegistry>, LinkRewriter) {
        let registry = Arc::new(AliasRegistry::new(
            Arc::new(MemoryKvStore::default()),
            8,
            "https://fl.io",
        ));
        (registry.clone(), LinkRewriter::new(registry))
    }

    #[tokio::test]
    async fn test_one_alias_per_actionable_url() {
        let (registry, rewriter) = rewriter();
        let (rewritten, minted) = rewriter.rewrite(&card(), "ROOTROOT").await.unwrap();

        // post_url + Pay + Vote
        assert_eq!(minted.len(), 3);
        assert_eq!(
            rewritten.post_url,
            format!("https://fl.io/a?r=ROOTROOT&n={}", minted[0])
        );
        assert_eq!(
            rewritten.buttons[2].target.as_deref(),
            Some(format!("https://fl.io/a?r=ROOTROOT&n={}", minted[1]).as_str())
        );
        assert_eq!(
            rewritten.buttons[3].target.as_deref(),
            Some(format!("https://fl.io/a?r=ROOTROOT&n={}", minted[2]).as_str())
        );

        let originals = ["https://ex.com/post", "https://ex.com/tx", "https://ex.com/vote"];
        for (id, original) in minted.iter().zip(originals) {
            assert_eq!(registry.resolve(id).await.unwrap().as_deref(), Some(original));
        }
    }

    #[tokio::test]
    async fn test_link_and_targetless_buttons_untouched() {
        let (_, rewriter) = rewriter();
        let (rewritten, _) = rewriter.rewrite(&card(), "ROOTROOT").await.unwrap();

        assert_eq!(rewritten.buttons[0], card().buttons[0]);
        assert_eq!(rewritten.buttons[1].target.as_deref(), Some("https://ex.com/docs"));
        assert_eq!(rewritten.image, card().image);
    }

    #[tokio::test]
    async fn test_button_post_url_override_is_wrapped() {
        let (registry, rewriter) = rewriter();
        let mut input = card();
        input.buttons.truncate(1);
        input.buttons[0].post_url = Some("https://ex.com/other".to_string());

        let (rewritten, minted) = rewriter.rewrite(&input, "ROOTROOT").await.unwrap();
        assert_eq!(minted.len(), 2);
        assert!(rewritten.buttons[0].post_url.as_deref().unwrap().ends_with(&minted[1]));
        assert_eq!(
            registry.resolve(&minted[1]).await.unwrap().as_deref(),
            Some("https://ex.com/other")
        );
    }
}
