//! Moderation inbox
//!
//! Recent, middling-score articles for a moderator to review. The candidate
//! set is published within the look-back window, scored between -10 and 5
//! and not a `[Boost]` post. The inbox narrows it further to articles the
//! moderator has not reacted to yet.

use crate::config::ModerationConfig;
use crate::db::query::{ArticleFilter, ArticleOrder, ArticleScope};
use crate::db::repositories::{ArticleRepository, UserRepository};
use crate::models::{
    normalize_tag_name, MembersFilter, ModerationArticle, ModerationFeed, ModerationParams, User,
};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Hard cap on inbox size
pub const MODERATION_LIMIT: i64 = 50;

pub const MODERATION_MIN_SCORE: i64 = -10;
pub const MODERATION_MAX_SCORE: i64 = 5;

/// Sponsored posts never enter the inbox
pub const BOOST_TITLE: &str = "[Boost]";

#[derive(Debug, thiserror::Error)]
pub enum ModerationServiceError {
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct ModerationService {
    articles: Arc<dyn ArticleRepository>,
    users: Arc<dyn UserRepository>,
    /// `None` when the configured window is out of chrono's range
    lookback: Option<Duration>,
}

impl ModerationService {
    pub fn new(
        articles: Arc<dyn ArticleRepository>,
        users: Arc<dyn UserRepository>,
        config: &ModerationConfig,
    ) -> Self {
        Self {
            articles,
            users,
            lookback: Duration::try_days(config.lookback_days),
        }
    }

    /// The scope for `params`; exposed for inspection
    pub fn scope(&self, params: &ModerationParams, now: DateTime<Utc>) -> ArticleScope {
        let mut scope = ArticleScope::published();

        if let Some(community_id) = params.community_id {
            scope = scope.filter(ArticleFilter::Community(community_id));
        }

        if let Some(cutoff) = self.lookback.and_then(|lookback| now.checked_sub_signed(lookback)) {
            scope = scope.filter(ArticleFilter::PublishedAfter(cutoff));
        }

        scope = scope
            .filter(ArticleFilter::ScoreBetween(MODERATION_MIN_SCORE, MODERATION_MAX_SCORE))
            .filter(ArticleFilter::TitleNot(BOOST_TITLE.to_string()));

        if params.feed == ModerationFeed::Inbox {
            scope = scope.filter(ArticleFilter::NotReactedBy(params.user_id));
        }

        match params.members {
            Some(MembersFilter::New) => {
                scope = scope.filter(ArticleFilter::NthPublishedBetween(
                    1,
                    MembersFilter::NEW_MEMBER_MAX_NTH,
                ));
            }
            Some(MembersFilter::NotNew) => {
                scope = scope.filter(ArticleFilter::NthPublishedAbove(
                    MembersFilter::NEW_MEMBER_MAX_NTH,
                ));
            }
            None => {}
        }

        if let Some(name) = params.tag.as_deref().and_then(normalize_tag_name) {
            scope = scope.filter(ArticleFilter::CachedTag(name));
        }

        scope
            .order_by(ArticleOrder::PublishedAtDesc)
            .limit(MODERATION_LIMIT)
    }

    pub async fn articles(
        &self,
        params: &ModerationParams,
    ) -> Result<Vec<ModerationArticle>, ModerationServiceError> {
        let articles = self.articles.find(&self.scope(params, Utc::now())).await?;

        let mut author_ids: Vec<i64> = articles.iter().map(|a| a.user_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<i64, User> = self
            .users
            .get_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        let entries = articles
            .into_iter()
            .filter_map(|article| {
                let author = authors.get(&article.user_id)?;
                Some(ModerationArticle::new(article, author))
            })
            .collect();

        Ok(entries)
    }

    /// The inbox as the JSON array the moderation UI consumes
    pub async fn articles_json(&self, params: &ModerationParams) -> Result<String, ModerationServiceError> {
        let entries = self.articles(params).await?;
        Ok(serde_json::to_string(&entries).context("Failed to serialize moderation articles")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        CommentRepository, CommentRepositoryImpl, SqlxArticleRepository, SqlxTagRepository,
        SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{
        Article, CreateArticleInput, CreateReactionInput, CreateUserInput, ReactionCategory,
    };
    use crate::services::TagService;

    struct Fixture {
        pool: DynDatabasePool,
        articles: Arc<dyn ArticleRepository>,
        users: Arc<dyn UserRepository>,
        author_id: i64,
        moderator_id: i64,
    }

    impl Fixture {
        async fn new() -> Self {
            let pool = create_test_pool()
                .await
                .expect("Failed to create test pool");
            migrations::run_migrations(&pool)
                .await
                .expect("Failed to run migrations");
            let users = SqlxUserRepository::boxed(pool.clone());
            let author_id = users.create(&CreateUserInput::new("ada", "Ada")).await.unwrap().id;
            let moderator_id = users
                .create(&CreateUserInput::new("mod", "Moderator"))
                .await
                .unwrap()
                .id;
            Self {
                articles: SqlxArticleRepository::boxed(pool.clone()),
                pool,
                users,
                author_id,
                moderator_id,
            }
        }

        async fn article(&self, title: &str, days_ago: i64, score: i64) -> Article {
            self.articles
                .create(
                    &CreateArticleInput::new(self.author_id, title)
                        .published_at(Utc::now() - Duration::days(days_ago))
                        .with_score(score),
                )
                .await
                .unwrap()
        }

        fn service(&self) -> ModerationService {
            ModerationService::new(self.articles.clone(), self.users.clone(), &ModerationConfig::default())
        }

        async fn react(&self, article_id: i64) {
            CommentRepositoryImpl::new(self.pool.clone())
                .add_reaction(&CreateReactionInput {
                    user_id: self.moderator_id,
                    reactable_id: article_id,
                    category: ReactionCategory::Thumbsup,
                })
                .await
                .unwrap();
        }
    }

    fn titles(entries: &[ModerationArticle]) -> Vec<&str> {
        entries.iter().map(|e| e.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_candidate_set_filters() {
        let fx = Fixture::new().await;
        fx.article("fresh", 1, 0).await;
        fx.article("edge high", 2, 5).await;
        fx.article("edge low", 3, -10).await;
        fx.article("too good", 1, 6).await;
        fx.article("too bad", 1, -11).await;
        fx.article("too old", 11, 0).await;
        fx.article("[Boost]", 1, 0).await;
        fx.articles
            .create(&CreateArticleInput::new(fx.author_id, "draft"))
            .await
            .unwrap();

        let entries = fx
            .service()
            .articles(&ModerationParams::inbox(fx.moderator_id))
            .await
            .unwrap();
        assert_eq!(titles(&entries), vec!["fresh", "edge high", "edge low"]);
        assert_eq!(entries[0].user.username, "ada");
        assert_eq!(entries[0].user.path, "/ada");
    }

    #[tokio::test]
    async fn test_inbox_hides_reacted_articles() {
        let fx = Fixture::new().await;
        let seen = fx.article("seen", 1, 0).await;
        fx.article("unseen", 2, 0).await;
        fx.react(seen.id).await;

        let inbox = fx
            .service()
            .articles(&ModerationParams::inbox(fx.moderator_id))
            .await
            .unwrap();
        assert_eq!(titles(&inbox), vec!["unseen"]);

        let all = fx
            .service()
            .articles(&ModerationParams::inbox(fx.moderator_id).with_feed(ModerationFeed::All))
            .await
            .unwrap();
        assert_eq!(titles(&all), vec!["seen", "unseen"]);
    }

    #[tokio::test]
    async fn test_unrepresentable_lookback_drops_window() {
        let fx = Fixture::new().await;
        fx.article("recent", 1, 0).await;
        fx.article("ancient", 900, 0).await;

        let config = ModerationConfig {
            lookback_days: 100_000_000,
        };
        let service = ModerationService::new(fx.articles.clone(), fx.users.clone(), &config);

        let entries = service
            .articles(&ModerationParams::inbox(fx.moderator_id))
            .await
            .unwrap();
        assert_eq!(titles(&entries), vec!["recent", "ancient"]);
    }

    #[tokio::test]
    async fn test_members_filter() {
        let fx = Fixture::new().await;
        for i in 1..=5 {
            fx.article(&format!("post {}", i), 6 - i, 0).await;
        }
        let service = fx.service();

        let new = service
            .articles(&ModerationParams::inbox(fx.moderator_id).with_members(MembersFilter::New))
            .await
            .unwrap();
        assert!(new.iter().all(|e| (1..=3).contains(&e.nth_published_by_author)));
        assert_eq!(new.len(), 3);

        let veterans = service
            .articles(&ModerationParams::inbox(fx.moderator_id).with_members(MembersFilter::NotNew))
            .await
            .unwrap();
        assert_eq!(titles(&veterans), vec!["post 5", "post 4"]);
    }

    #[tokio::test]
    async fn test_tag_and_community_filters() {
        let fx = Fixture::new().await;
        let tags = TagService::new(SqlxTagRepository::boxed(fx.pool.clone()), fx.articles.clone());
        let rust = fx.article("rust", 1, 0).await;
        tags.assign_tags(rust.id, &["rust"]).await.unwrap();
        fx.article("untagged", 1, 0).await;
        fx.articles
            .create(
                &CreateArticleInput::new(fx.author_id, "local")
                    .published_at(Utc::now() - Duration::days(1))
                    .in_community(7),
            )
            .await
            .unwrap();

        let service = fx.service();
        let tagged = service
            .articles(&ModerationParams::inbox(fx.moderator_id).with_tag("Rust"))
            .await
            .unwrap();
        assert_eq!(titles(&tagged), vec!["rust"]);

        let malformed = service
            .articles(&ModerationParams::inbox(fx.moderator_id).with_tag("not a tag!"))
            .await
            .unwrap();
        assert_eq!(malformed.len(), 3);

        let local = service
            .articles(&ModerationParams::inbox(fx.moderator_id).in_community(7))
            .await
            .unwrap();
        assert_eq!(titles(&local), vec!["local"]);
    }

    #[tokio::test]
    async fn test_result_is_capped() {
        let fx = Fixture::new().await;
        for i in 0..55 {
            fx.article(&format!("candidate {}", i), 1, 0).await;
        }
        let entries = fx
            .service()
            .articles(&ModerationParams::inbox(fx.moderator_id))
            .await
            .unwrap();
        assert_eq!(entries.len(), MODERATION_LIMIT as usize);
    }

    #[tokio::test]
    async fn test_json_shape() {
        let fx = Fixture::new().await;
        let article = fx.article("shape", 1, 0).await;

        let json = fx
            .service()
            .articles_json(&ModerationParams::inbox(fx.moderator_id))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entry = &value[0];

        assert_eq!(entry["id"], article.id);
        assert_eq!(entry["title"], "shape");
        assert_eq!(entry["path"], article.path.as_str());
        assert_eq!(entry["nth_published_by_author"], 1);
        assert_eq!(entry["user"]["username"], "ada");
        assert_eq!(entry["user"]["articles_count"], 1);
        assert_eq!(entry["user"]["id"], fx.author_id);

        let empty = fx
            .service()
            .articles_json(&ModerationParams::inbox(fx.moderator_id).in_community(99))
            .await
            .unwrap();
        assert_eq!(empty, "[]");
    }
}
