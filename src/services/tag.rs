//! Tag service
//!
//! The single write path for article tags. Every assignment rewrites the
//! `article_tags` join rows and the denormalized `cached_tag_list` in one
//! call, so the two representations never drift apart.

use crate::db::repositories::{ArticleRepository, TagRepository};
use crate::models::{join_tag_list, normalize_tag_name, Tag, MAX_TAGS_PER_ARTICLE};
use std::sync::Arc;

/// Error types for tag service operations
#[derive(Debug, thiserror::Error)]
pub enum TagServiceError {
    #[error("Article not found: {0}")]
    NotFound(i64),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub struct TagService {
    tag_repo: Arc<dyn TagRepository>,
    article_repo: Arc<dyn ArticleRepository>,
}

impl TagService {
    pub fn new(tag_repo: Arc<dyn TagRepository>, article_repo: Arc<dyn ArticleRepository>) -> Self {
        Self {
            tag_repo,
            article_repo,
        }
    }

    /// Replace an article's tags.
    ///
    /// Names are normalized and deduplicated in the order given; malformed
    /// names are skipped and anything past the fourth tag is ignored.
    /// Returns the tags now attached, in assignment order.
    pub async fn assign_tags<S: AsRef<str>>(
        &self,
        article_id: i64,
        names: &[S],
    ) -> Result<Vec<Tag>, TagServiceError> {
        if self.article_repo.get_by_id(article_id).await?.is_none() {
            return Err(TagServiceError::NotFound(article_id));
        }

        let names = clean_tag_names(names);

        let mut tags = Vec::with_capacity(names.len());
        for name in &names {
            tags.push(self.tag_repo.find_or_create(name).await?);
        }

        let tag_ids: Vec<i64> = tags.iter().map(|tag| tag.id).collect();
        let tag_list = join_tag_list(&names);
        self.tag_repo
            .replace_article_tags(article_id, &tag_ids, &tag_list)
            .await?;

        tracing::debug!(article_id, tags = %tag_list, "Assigned tags");
        Ok(tags)
    }

    /// Tags attached to an article through the join table
    pub async fn tags_for(&self, article_id: i64) -> Result<Vec<Tag>, TagServiceError> {
        Ok(self.tag_repo.list_for_article(article_id).await?)
    }
}

/// Normalize, drop invalid names and duplicates, keep at most four
pub fn clean_tag_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for name in names.iter().filter_map(|raw| normalize_tag_name(raw.as_ref())) {
        if cleaned.len() == MAX_TAGS_PER_ARTICLE {
            break;
        }
        if !cleaned.contains(&name) {
            cleaned.push(name);
        }
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxArticleRepository, SqlxTagRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{split_tag_list, CreateArticleInput, CreateUserInput};
    use proptest::prelude::*;

    async fn setup_test_service() -> (DynDatabasePool, TagService, i64) {
        let pool = create_test_pool()
            .await
            .expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user = SqlxUserRepository::new(pool.clone())
            .create(&CreateUserInput::new("ada", "Ada"))
            .await
            .unwrap();
        let article_repo = SqlxArticleRepository::boxed(pool.clone());
        let article = article_repo
            .create(&CreateArticleInput::new(user.id, "Tagged").published())
            .await
            .unwrap();

        let service = TagService::new(SqlxTagRepository::boxed(pool.clone()), article_repo);
        (pool, service, article.id)
    }

    #[test]
    fn test_clean_tag_names() {
        assert_eq!(
            clean_tag_names(&["#Rust", "rust", "web dev", "discuss"]),
            vec!["rust", "discuss"]
        );
        assert_eq!(
            clean_tag_names(&["a", "b", "c", "d", "e"]),
            vec!["a", "b", "c", "d"]
        );
        assert!(clean_tag_names::<&str>(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_assign_tags_updates_both_representations() {
        let (pool, service, article_id) = setup_test_service().await;

        let tags = service
            .assign_tags(article_id, &["discuss", "#Rust", "c++"])
            .await
            .expect("Failed to assign tags");
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["discuss", "rust"]);

        let article = SqlxArticleRepository::new(pool)
            .get_by_id(article_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(article.cached_tag_list, "discuss, rust");

        let joined = service.tags_for(article_id).await.unwrap();
        assert_eq!(joined.len(), 2);
    }

    #[tokio::test]
    async fn test_reassigning_replaces_tags() {
        let (_pool, service, article_id) = setup_test_service().await;

        service.assign_tags(article_id, &["discuss", "rust"]).await.unwrap();
        service.assign_tags(article_id, &["go"]).await.unwrap();

        let joined: Vec<String> = service
            .tags_for(article_id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(joined, vec!["go".to_string()]);

        service.assign_tags::<&str>(article_id, &[]).await.unwrap();
        assert!(service.tags_for(article_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assign_tags_missing_article() {
        let (_pool, service, _) = setup_test_service().await;
        let result = service.assign_tags(9999, &["discuss"]).await;
        assert!(matches!(result, Err(TagServiceError::NotFound(9999))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// The cached list always names exactly the joined tags.
        #[test]
        fn cached_list_matches_join_table(names in prop::collection::vec("[#]?[a-zA-Z0-9 ]{0,8}", 0..7)) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let (pool, service, article_id) = setup_test_service().await;
                service.assign_tags(article_id, &names).await.unwrap();

                let article = SqlxArticleRepository::new(pool)
                    .get_by_id(article_id)
                    .await
                    .unwrap()
                    .unwrap();
                let mut cached: Vec<String> =
                    split_tag_list(&article.cached_tag_list).into_iter().map(String::from).collect();
                let mut joined: Vec<String> =
                    service.tags_for(article_id).await.unwrap().into_iter().map(|t| t.name).collect();
                cached.sort();
                joined.sort();

                prop_assert!(joined.len() <= MAX_TAGS_PER_ARTICLE);
                prop_assert_eq!(cached, joined);
                Ok(())
            })?;
        }
    }
}
