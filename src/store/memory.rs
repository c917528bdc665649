use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    auth::{NewUser, User},
    conversations::Conversation,
    notifications::{Notification, NotificationKind},
    posts::{sort_comments, Comment, NewPost, Post, PostDocument},
    store::{
        member_pair, ConversationStore, NotificationStore, Page, PictureSlot, PostStore,
        SocialGraph, StoreError, StoreResult, StoryStore, UserStore,
    },
    stories::{NewStory, Story},
    users::ProfileUpdate,
};

/// In-memory store for tests and local demos.
/// Each operation runs under one lock, which makes it atomic.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<State>,
}

#[derive(Default)]
struct State {
    users: Vec<User>,
    /// (follower, target)
    follows: Vec<(Uuid, Uuid)>,
    posts: Vec<Post>,
    /// (post, user)
    likes: Vec<(Uuid, Uuid)>,
    comments: Vec<Comment>,
    next_comment_seq: i64,
    conversations: Vec<Conversation>,
    notifications: Vec<Notification>,
    stories: Vec<Story>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl State {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn require_user(&self, id: Uuid) -> StoreResult<()> {
        self.user(id).map(|_| ()).ok_or(StoreError::NotFound("User"))
    }

    fn user_mut(&mut self, id: Uuid) -> StoreResult<&mut User> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(StoreError::NotFound("User"))
    }

    fn post(&self, id: Uuid) -> StoreResult<&Post> {
        self.posts
            .iter()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound("Post"))
    }

    fn document(&self, post: &Post) -> PostDocument {
        let likes = self
            .likes
            .iter()
            .filter(|(p, _)| *p == post.id)
            .map(|(_, u)| *u)
            .collect();
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .filter(|c| c.post_id == post.id)
            .cloned()
            .collect();
        sort_comments(&mut comments);

        PostDocument {
            post: post.clone(),
            likes,
            comments,
        }
    }

    fn check_unique(&self, user: &NewUser) -> StoreResult<()> {
        let taken = self.users.iter().any(|u| {
            u.username == user.username
                || u.email == user.email
                || (user.phone.is_some() && u.phone == user.phone)
        });
        if taken {
            return Err(StoreError::Conflict(
                "Username, email or phone already exists".to_string(),
            ));
        }
        Ok(())
    }

    fn notify(&mut self, notification: Option<Notification>) {
        if let Some(n) = notification {
            self.notifications.push(n);
        }
    }
}

/// Newest first; among equal timestamps the later insertion wins.
fn newest_first<T: Clone>(items: &[T], created_at: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    let mut out: Vec<T> = items.iter().rev().cloned().collect();
    out.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    out
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.state()?;
        state.check_unique(&user)?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            phone: user.phone,
            first_name: user.first_name,
            last_name: user.last_name,
            bio: None,
            profile_pic: user.profile_pic,
            cover_pic: None,
            password_hash: user.password_hash,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state()?.user(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .state()?
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        Ok(self
            .state()?
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn list_users_except(&self, id: Uuid) -> StoreResult<Vec<User>> {
        Ok(self
            .state()?
            .users
            .iter()
            .filter(|u| u.id != id)
            .cloned()
            .collect())
    }

    async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> StoreResult<User> {
        let mut state = self.state()?;
        if let Some(phone) = &update.phone {
            let taken = state
                .users
                .iter()
                .any(|u| u.id != id && u.phone.as_ref() == Some(phone));
            if taken {
                return Err(StoreError::Conflict("Phone already in use".to_string()));
            }
        }

        let user = state.user_mut(id)?;
        if let Some(first_name) = update.first_name {
            user.first_name = Some(first_name);
        }
        if let Some(last_name) = update.last_name {
            user.last_name = Some(last_name);
        }
        if let Some(bio) = update.bio {
            user.bio = Some(bio);
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_picture(&self, id: Uuid, slot: PictureSlot, url: &str) -> StoreResult<User> {
        let mut state = self.state()?;
        let user = state.user_mut(id)?;
        match slot {
            PictureSlot::Profile => user.profile_pic = Some(url.to_string()),
            PictureSlot::Cover => user.cover_pic = Some(url.to_string()),
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait]
impl SocialGraph for InMemoryStore {
    async fn follow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool> {
        let mut state = self.state()?;
        state.require_user(follower)?;
        state.require_user(target)?;

        if state.follows.contains(&(follower, target)) {
            return Ok(false);
        }
        state.follows.push((follower, target));
        state.notify(Notification::fan_out(
            NotificationKind::Follow,
            target,
            follower,
            None,
        ));
        Ok(true)
    }

    async fn unfollow(&self, follower: Uuid, target: Uuid) -> StoreResult<bool> {
        let mut state = self.state()?;
        state.require_user(follower)?;
        state.require_user(target)?;

        let before = state.follows.len();
        state.follows.retain(|edge| *edge != (follower, target));
        Ok(state.follows.len() != before)
    }

    async fn followers(&self, id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self
            .state()?
            .follows
            .iter()
            .filter(|(_, target)| *target == id)
            .map(|(follower, _)| *follower)
            .collect())
    }

    async fn following(&self, id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self
            .state()?
            .follows
            .iter()
            .filter(|(follower, _)| *follower == id)
            .map(|(_, target)| *target)
            .collect())
    }
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn insert_post(&self, post: NewPost) -> StoreResult<Post> {
        let mut state = self.state()?;
        state.require_user(post.author_id)?;

        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            author_id: post.author_id,
            content: post.content,
            image: post.image,
            created_at: now,
            updated_at: now,
        };
        state.posts.push(post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<PostDocument>> {
        let state = self.state()?;
        Ok(state
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|p| state.document(p)))
    }

    async fn list_posts(
        &self,
        author: Option<Uuid>,
        page: Page,
    ) -> StoreResult<Vec<PostDocument>> {
        let state = self.state()?;
        let posts: Vec<Post> = state
            .posts
            .iter()
            .filter(|p| author.map_or(true, |a| p.author_id == a))
            .cloned()
            .collect();

        Ok(newest_first(&posts, |p| p.created_at)
            .iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .map(|p| state.document(p))
            .collect())
    }

    async fn find_posts(&self, ids: &[Uuid]) -> StoreResult<Vec<Post>> {
        Ok(self
            .state()?
            .posts
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn toggle_like(&self, post_id: Uuid, user: Uuid) -> StoreResult<bool> {
        let mut state = self.state()?;
        let author = state.post(post_id)?.author_id;
        state.require_user(user)?;

        if state.likes.contains(&(post_id, user)) {
            state.likes.retain(|like| *like != (post_id, user));
            return Ok(false);
        }

        state.likes.push((post_id, user));
        state.notify(Notification::fan_out(
            NotificationKind::Like,
            author,
            user,
            Some(post_id),
        ));
        Ok(true)
    }

    async fn add_comment(&self, post_id: Uuid, author: Uuid, text: &str) -> StoreResult<Comment> {
        let mut state = self.state()?;
        let owner = state.post(post_id)?.author_id;
        state.require_user(author)?;

        state.next_comment_seq += 1;
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            author_id: author,
            text: text.to_string(),
            is_deleted: false,
            seq: state.next_comment_seq,
            created_at: Utc::now(),
        };
        state.comments.push(comment.clone());
        state.notify(Notification::fan_out(
            NotificationKind::Comment,
            owner,
            author,
            Some(post_id),
        ));
        Ok(comment)
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn get_or_create_conversation(&self, a: Uuid, b: Uuid) -> StoreResult<Conversation> {
        let mut state = self.state()?;
        state.require_user(a)?;
        state.require_user(b)?;

        let (low, high) = member_pair(a, b);
        if let Some(existing) = state
            .conversations
            .iter()
            .find(|c| c.member_low == low && c.member_high == high)
        {
            return Ok(existing.clone());
        }

        let conversation = Conversation {
            id: Uuid::new_v4(),
            member_low: low,
            member_high: high,
            created_at: Utc::now(),
        };
        state.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn conversations_for(&self, user: Uuid) -> StoreResult<Vec<Conversation>> {
        let state = self.state()?;
        let mine: Vec<Conversation> = state
            .conversations
            .iter()
            .filter(|c| c.has_member(user))
            .cloned()
            .collect();
        Ok(newest_first(&mine, |c| c.created_at))
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn notifications_for(&self, user: Uuid) -> StoreResult<Vec<Notification>> {
        let state = self.state()?;
        let inbox: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| n.user_id == user)
            .cloned()
            .collect();
        Ok(newest_first(&inbox, |n| n.created_at))
    }
}

#[async_trait]
impl StoryStore for InMemoryStore {
    async fn insert_story(&self, story: NewStory) -> StoreResult<Story> {
        let mut state = self.state()?;
        state.require_user(story.author_id)?;

        let story = Story {
            id: Uuid::new_v4(),
            author_id: story.author_id,
            media_url: story.media_url,
            created_at: Utc::now(),
        };
        state.stories.push(story.clone());
        Ok(story)
    }

    async fn stories_by(
        &self,
        authors: &[Uuid],
        since: chrono::DateTime<Utc>,
    ) -> StoreResult<Vec<Story>> {
        let state = self.state()?;
        let live: Vec<Story> = state
            .stories
            .iter()
            .filter(|s| authors.contains(&s.author_id) && s.created_at >= since)
            .cloned()
            .collect();
        Ok(newest_first(&live, |s| s.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user(store: &InMemoryStore, name: &str) -> User {
        store
            .insert_user(NewUser {
                username: name.to_string(),
                email: format!("{name}@x.com"),
                ..NewUser::default()
            })
            .await
            .unwrap()
    }

    async fn post(store: &InMemoryStore, author: Uuid) -> Post {
        store
            .insert_post(NewPost {
                author_id: author,
                content: "hello".to_string(),
                image: "https://img/p.png".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = InMemoryStore::new();
        user(&store, "alice").await;
        let err = store
            .insert_user(NewUser {
                username: "other".to_string(),
                email: "alice@x.com".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn follow_is_idempotent_and_notifies_once() {
        let store = InMemoryStore::new();
        let a = user(&store, "alice").await;
        let b = user(&store, "bob").await;

        assert!(store.follow(a.id, b.id).await.unwrap());
        assert!(!store.follow(a.id, b.id).await.unwrap());

        assert_eq!(store.followers(b.id).await.unwrap(), vec![a.id]);
        assert_eq!(store.following(a.id).await.unwrap(), vec![b.id]);
        let inbox = store.notifications_for(b.id).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::Follow);
        assert_eq!(inbox[0].friend_id, a.id);
    }

    #[tokio::test]
    async fn unfollow_without_edge_is_noop() {
        let store = InMemoryStore::new();
        let a = user(&store, "alice").await;
        let b = user(&store, "bob").await;

        assert!(!store.unfollow(a.id, b.id).await.unwrap());
        store.follow(a.id, b.id).await.unwrap();
        assert!(store.unfollow(a.id, b.id).await.unwrap());
        assert!(store.followers(b.id).await.unwrap().is_empty());
        assert!(store.following(a.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn follow_unknown_user_is_not_found() {
        let store = InMemoryStore::new();
        let a = user(&store, "alice").await;
        let err = store.follow(a.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound("User")));
    }

    #[tokio::test]
    async fn toggle_like_twice_restores_state() {
        let store = InMemoryStore::new();
        let a = user(&store, "alice").await;
        let b = user(&store, "bob").await;
        let p = post(&store, a.id).await;

        assert!(store.toggle_like(p.id, b.id).await.unwrap());
        assert!(!store.toggle_like(p.id, b.id).await.unwrap());

        let doc = store.find_post(p.id).await.unwrap().unwrap();
        assert!(!doc.is_liked_by(b.id));
        assert_eq!(store.notifications_for(a.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn liking_own_post_does_not_notify() {
        let store = InMemoryStore::new();
        let a = user(&store, "alice").await;
        let p = post(&store, a.id).await;

        assert!(store.toggle_like(p.id, a.id).await.unwrap());
        assert!(store.notifications_for(a.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggle_like_on_missing_post() {
        let store = InMemoryStore::new();
        let a = user(&store, "alice").await;
        let err = store.toggle_like(Uuid::new_v4(), a.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound("Post")));
    }

    #[tokio::test]
    async fn toggle_like_by_unknown_user_is_not_found() {
        let store = InMemoryStore::new();
        let a = user(&store, "alice").await;
        let p = post(&store, a.id).await;

        let err = store.toggle_like(p.id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound("User")));
        assert!(store.find_post(p.id).await.unwrap().unwrap().likes.is_empty());
        assert!(store.notifications_for(a.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn comments_read_newest_first() {
        let store = InMemoryStore::new();
        let a = user(&store, "alice").await;
        let b = user(&store, "bob").await;
        let p = post(&store, a.id).await;

        let first = store.add_comment(p.id, b.id, "first").await.unwrap();
        let second = store.add_comment(p.id, b.id, "second").await.unwrap();

        let doc = store.find_post(p.id).await.unwrap().unwrap();
        let ids: Vec<Uuid> = doc.comments.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(store.notifications_for(a.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn conversation_pair_is_unique() {
        let store = InMemoryStore::new();
        let a = user(&store, "alice").await;
        let b = user(&store, "bob").await;

        let first = store.get_or_create_conversation(a.id, b.id).await.unwrap();
        let second = store.get_or_create_conversation(b.id, a.id).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.conversations_for(a.id).await.unwrap().len(), 1);
        assert_eq!(store.conversations_for(b.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_posts_filters_by_author_newest_first() {
        let store = InMemoryStore::new();
        let a = user(&store, "alice").await;
        let b = user(&store, "bob").await;
        let older = post(&store, a.id).await;
        post(&store, b.id).await;
        let newer = post(&store, a.id).await;

        let docs = store.list_posts(Some(a.id), Page::default()).await.unwrap();
        let ids: Vec<Uuid> = docs.iter().map(|d| d.post.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);

        let all = store.list_posts(None, Page::new(Some(2), None)).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn phone_collision_on_profile_update() {
        let store = InMemoryStore::new();
        let a = store
            .insert_user(NewUser {
                username: "alice".to_string(),
                email: "alice@x.com".to_string(),
                phone: Some("555-0100".to_string()),
                ..NewUser::default()
            })
            .await
            .unwrap();
        let b = user(&store, "bob").await;

        let err = store
            .update_profile(
                b.id,
                ProfileUpdate {
                    phone: a.phone.clone(),
                    ..ProfileUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn stories_filter_by_author_and_window() {
        let store = InMemoryStore::new();
        let a = user(&store, "alice").await;
        let b = user(&store, "bob").await;
        let c = user(&store, "carol").await;

        let story = |author: Uuid| NewStory {
            author_id: author,
            media_url: "https://img/s.png".to_string(),
        };
        let older = store.insert_story(story(a.id)).await.unwrap();
        let newer = store.insert_story(story(a.id)).await.unwrap();
        store.insert_story(story(c.id)).await.unwrap();

        let since = Utc::now() - chrono::Duration::hours(24);
        let live = store.stories_by(&[a.id, b.id], since).await.unwrap();
        let ids: Vec<Uuid> = live.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);

        let future = Utc::now() + chrono::Duration::seconds(5);
        assert!(store.stories_by(&[a.id], future).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn story_for_unknown_author_is_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .insert_story(NewStory {
                author_id: Uuid::new_v4(),
                media_url: "https://img/s.png".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("User")));
    }
}
