// Tests for the prompt store

mod common;

use std::sync::Arc;

use common::{create_test_db, create_test_repo};
use sharpie::db::{NewPrompt, PromptRepository, PromptStore, StoreError};

fn new_prompt(id: &str) -> NewPrompt {
    NewPrompt {
        id: id.to_string(),
        system_prompt: "You are a pirate.".to_string(),
        user_prompt: "Say hello".to_string(),
        model: "qwen2.5:3b".to_string(),
        response: String::new(),
    }
}

#[tokio::test]
async fn test_database_initialization() {
    let (db, _temp) = create_test_db();
    assert!(db.path().contains("test.db"));
    assert!(db.health_check().await);
}

#[tokio::test]
async fn test_save_and_get_prompt() {
    let (repo, _temp) = create_test_repo();

    let saved = repo.save_prompt(new_prompt("abc123")).await.unwrap();
    assert_eq!(saved.hits, 0);
    assert_eq!(saved.response, "");

    let fetched = repo.get_prompt("abc123").await.unwrap();
    assert_eq!(fetched.id, "abc123");
    assert_eq!(fetched.system_prompt, "You are a pirate.");
    assert_eq!(fetched.user_prompt, "Say hello");
    assert_eq!(fetched.model, "qwen2.5:3b");
    assert_eq!(fetched.created_at, saved.created_at);
    assert_eq!(fetched.hits, 1);

    let again = repo.get_prompt("abc123").await.unwrap();
    assert_eq!(again.hits, 2);
}

#[tokio::test]
async fn test_duplicate_key() {
    let (repo, _temp) = create_test_repo();

    repo.save_prompt(new_prompt("dup001")).await.unwrap();
    let err = repo.save_prompt(new_prompt("dup001")).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey(id) if id == "dup001"));
}

#[tokio::test]
async fn test_get_unknown_prompt_creates_nothing() {
    let (repo, _temp) = create_test_repo();

    let err = repo.get_prompt("nope00").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(repo.list_recent(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_arbitrary_text_round_trips() {
    let (repo, _temp) = create_test_repo();

    let mut prompt = new_prompt("utf8ok");
    prompt.system_prompt = "Ünïcødé 🚀 'quotes' \"double\" \n\t; DROP TABLE prompts;".to_string();
    prompt.user_prompt = "x".repeat(20_000);
    repo.save_prompt(prompt.clone()).await.unwrap();

    let fetched = repo.get_prompt("utf8ok").await.unwrap();
    assert_eq!(fetched.system_prompt, prompt.system_prompt);
    assert_eq!(fetched.user_prompt.len(), 20_000);
}

#[tokio::test]
async fn test_update_response() {
    let (repo, _temp) = create_test_repo();
    repo.save_prompt(new_prompt("resp01")).await.unwrap();

    repo.update_response("resp01", "Ahoy!").await.unwrap();
    let fetched = repo.get_prompt("resp01").await.unwrap();
    assert_eq!(fetched.response, "Ahoy!");

    let err = repo.update_response("missing", "x").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_create_fork() {
    let (repo, _temp) = create_test_repo();
    repo.save_prompt(new_prompt("parent")).await.unwrap();
    repo.save_prompt(new_prompt("child1")).await.unwrap();

    let fork = repo.create_fork("child1", "parent").await.unwrap();
    assert_eq!(fork.parent_id, "parent");

    let lineage = repo.get_fork("child1").await.unwrap().unwrap();
    assert_eq!(lineage, fork);
    assert!(repo.get_fork("parent").await.unwrap().is_none());
}

#[tokio::test]
async fn test_fork_with_missing_parent_violates_foreign_key() {
    let (repo, _temp) = create_test_repo();
    repo.save_prompt(new_prompt("orphan")).await.unwrap();

    let err = repo.create_fork("orphan", "ghost0").await.unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation(_)));
}

#[tokio::test]
async fn test_list_recent_and_popular() {
    let (repo, _temp) = create_test_repo();
    for id in ["first0", "second", "third0"] {
        repo.save_prompt(new_prompt(id)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    for _ in 0..3 {
        repo.get_prompt("second").await.unwrap();
    }
    repo.get_prompt("first0").await.unwrap();

    let recent: Vec<String> = repo.list_recent(10).await.unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(recent, vec!["third0", "second", "first0"]);

    let popular = repo.list_popular(2).await.unwrap();
    assert_eq!(popular.len(), 2);
    assert_eq!(popular[0].id, "second");
    assert_eq!(popular[0].hits, 3);
    assert_eq!(popular[1].id, "first0");

    // Listing is not a fetch
    assert_eq!(repo.list_popular(1).await.unwrap()[0].hits, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_fetches_lose_no_hits() {
    const FETCHERS: usize = 32;

    let (repo, _temp) = create_test_repo();
    repo.save_prompt(new_prompt("hot001")).await.unwrap();

    let handles: Vec<_> = (0..FETCHERS)
        .map(|_| {
            let repo: Arc<PromptRepository> = repo.clone();
            tokio::spawn(async move { repo.get_prompt("hot001").await.unwrap().hits })
        })
        .collect();

    let mut seen = Vec::new();
    for handle in handles {
        seen.push(handle.await.unwrap());
    }

    // Every fetch observed a distinct counter value
    seen.sort_unstable();
    assert_eq!(seen, (1..=FETCHERS as u64).collect::<Vec<_>>());

    let listed = repo.list_recent(1).await.unwrap();
    assert_eq!(listed[0].hits, FETCHERS as u64);
}
