use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    auth::{NewUser, User},
    conversations::Conversation,
    notifications::{Notification, NotificationKind},
    posts::{Comment, NewPost, Post, PostDocument},
    store::{
        member_pair, ConversationStore, NotificationStore, Page, PictureSlot, PostStore,
        SocialGraph, StoreError, StoreResult, StoryStore, UserStore,
    },
    stories::{NewStory, Story},
    users::ProfileUpdate,
};

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn documents(&self, posts: Vec<Post>) -> StoreResult<Vec<PostDocument>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();

        let likes = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT post_id, user_id FROM post_likes WHERE post_id = ANY($1) ORDER BY created_at",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT * FROM comments
            WHERE post_id = ANY($1)
            ORDER BY created_at DESC, seq DESC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut likes_by_post: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (post_id, user_id) in likes {
            likes_by_post.entry(post_id).or_default().push(user_id);
        }
        let mut comments_by_post: HashMap<Uuid, Vec<Comment>> = HashMap::new();
        for comment in comments {
            comments_by_post
                .entry(comment.post_id)
                .or_default()
                .push(comment);
        }

        Ok(posts
            .into_iter()
            .map(|post| PostDocument {
                likes: likes_by_post.remove(&post.id).unwrap_or_default(),
                comments: comments_by_post.remove(&post.id).unwrap_or_default(),
                post,
            })
            .collect())
    }
}

/// Unique violations become `Conflict`, foreign-key violations a missing user.
fn classify(e: sqlx::Error, conflict: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(conflict.to_string())
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::NotFound("User"),
        _ => StoreError::Database(e),
    }
}

async fn require_users(conn: &mut PgConnection, ids: &[Uuid]) -> StoreResult<()> {
    let mut wanted = ids.to_vec();
    wanted.sort();
    wanted.dedup();

    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = ANY($1)")
        .bind(&wanted)
        .fetch_one(&mut *conn)
        .await?;

    if found != wanted.len() as i64 {
        return Err(StoreError::NotFound("User"));
    }
    Ok(())
}

async fn insert_notification(
    conn: &mut PgConnection,
    notification: Option<Notification>,
) -> StoreResult<()> {
    let Some(n) = notification else {
        return Ok(());
    };

    sqlx::query(
        r#"
        INSERT INTO notifications (id, kind, user_id, friend_id, post_id, content, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(n.id)
    .bind(n.kind)
    .bind(n.user_id)
    .bind(n.friend_id)
    .bind(n.post_id)
    .bind(&n.content)
    .bind(n.created_at)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(kind = ?n.kind, recipient = %n.user_id, "notification written");
    Ok(())
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, phone, first_name, last_name, profile_pic, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.profile_pic)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "Username, email or phone already exists"))
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn list_users_except(&self, id: Uuid) -> StoreResult<Vec<User>> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id <> $1 ORDER BY created_at ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                bio = COALESCE($4, bio),
                phone = COALESCE($5, phone),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.bio)
        .bind(&update.phone)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "Phone already in use"))?
        .ok_or(StoreError::NotFound("User"))
    }

    async fn set_picture(&self, id: Uuid, slot: PictureSlot, url: &str) -> StoreResult<User> {
        let query = match slot {
            PictureSlot::Profile => {
                "UPDATE users SET profile_pic = $2, updated_at = NOW() WHERE id = $1 RETURNING *"
            }
            PictureSlot::Cover => {
                "UPDATE users SET cover_pic = $2, updated_at = NOW() WHERE id = $1 RETURNING *"
            }
        };

        sqlx::query_as::<_, User>(query)
            .bind(id)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound("User"))
    }
}

#[async_trait]
impl SocialGraph for PgStore {
    async fn follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        require_users(&mut tx, &[follower, target]).await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, following_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, following_id) DO NOTHING
            "#,
        )
        .bind(follower)
        .bind(target)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if inserted {
            insert_notification(
                &mut tx,
                Notification::fan_out(NotificationKind::Follow, target, follower, None),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn unfollow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool> {
        let mut conn = self.pool.acquire().await?;

        require_users(&mut conn, &[follower, target]).await?;

        let removed = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
            .bind(follower)
            .bind(target)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        Ok(removed > 0)
    }

    async fn followers(&self, id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(sqlx::query_scalar::<_, Uuid>(
            "SELECT follower_id FROM follows WHERE following_id = $1 ORDER BY created_at",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn following(&self, id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(sqlx::query_scalar::<_, Uuid>(
            "SELECT following_id FROM follows WHERE follower_id = $1 ORDER BY created_at",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, author_id, content, image)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post.author_id)
        .bind(&post.content)
        .bind(&post.image)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "Post already exists"))
    }

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<PostDocument>> {
        let Some(post) = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        Ok(self.documents(vec![post]).await?.pop())
    }

    async fn list_posts(
        &self,
        author: Option<Uuid>,
        page: Page,
    ) -> StoreResult<Vec<PostDocument>> {
        let posts = sqlx::query_as::<_, Post>(
            r#"
            SELECT * FROM posts
            WHERE ($1::uuid IS NULL OR author_id = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(author)
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        self.documents(posts).await
    }

    async fn find_posts(&self, ids: &[Uuid]) -> StoreResult<Vec<Post>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(
            sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn toggle_like(&self, post_id: Uuid, user: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent toggles on the same post.
        let author =
            sqlx::query_scalar::<_, Uuid>("SELECT author_id FROM posts WHERE id = $1 FOR UPDATE")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::NotFound("Post"))?;

        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if removed > 0 {
            tx.commit().await?;
            return Ok(false);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO post_likes (post_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(user)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify(e, "Like already exists"))?
        .rows_affected()
            == 1;

        if inserted {
            insert_notification(
                &mut tx,
                Notification::fan_out(NotificationKind::Like, author, user, Some(post_id)),
            )
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn add_comment(&self, post_id: Uuid, author: Uuid, text: &str) -> StoreResult<Comment> {
        let mut tx = self.pool.begin().await?;

        let owner = sqlx::query_scalar::<_, Uuid>("SELECT author_id FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StoreError::NotFound("Post"))?;

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, post_id, author_id, text)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(author)
        .bind(text)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify(e, "Comment already exists"))?;

        insert_notification(
            &mut tx,
            Notification::fan_out(NotificationKind::Comment, owner, author, Some(post_id)),
        )
        .await?;

        tx.commit().await?;
        Ok(comment)
    }
}

#[async_trait]
impl ConversationStore for PgStore {
    async fn get_or_create_conversation(&self, a: Uuid, b: Uuid) -> StoreResult<Conversation> {
        let (low, high) = member_pair(a, b);

        // The no-op update makes RETURNING yield the existing row on conflict.
        sqlx::query_as::<_, Conversation>(
            r#"
            INSERT INTO conversations (id, member_low, member_high)
            VALUES ($1, $2, $3)
            ON CONFLICT (member_low, member_high)
            DO UPDATE SET member_low = EXCLUDED.member_low
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(low)
        .bind(high)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "Conversation already exists"))
    }

    async fn conversations_for(&self, user: Uuid) -> StoreResult<Vec<Conversation>> {
        Ok(sqlx::query_as::<_, Conversation>(
            r#"
            SELECT * FROM conversations
            WHERE member_low = $1 OR member_high = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn notifications_for(&self, user: Uuid) -> StoreResult<Vec<Notification>> {
        Ok(sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC, seq DESC",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl StoryStore for PgStore {
    async fn insert_story(&self, story: NewStory) -> StoreResult<Story> {
        sqlx::query_as::<_, Story>(
            r#"
            INSERT INTO stories (id, author_id, media_url)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(story.author_id)
        .bind(&story.media_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "Story already exists"))
    }

    async fn stories_by(&self, authors: &[Uuid], since: DateTime<Utc>) -> StoreResult<Vec<Story>> {
        if authors.is_empty() {
            return Ok(Vec::new());
        }
        Ok(sqlx::query_as::<_, Story>(
            r#"
            SELECT * FROM stories
            WHERE author_id = ANY($1) AND created_at >= $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(authors)
        .bind(since)
        .fetch_all(&self.pool)
        .await?)
    }
}
