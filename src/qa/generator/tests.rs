use super::*;
use crate::crawler::cache::ContentCache;
use crate::crawler::HttpClient;
use crate::testing::FakeChat;
use std::fs;
use tempfile::TempDir;

#[test]
fn prompt_embeds_content_and_format() {
    let prompt = build_qa_prompt("Subnets split a VPC.");
    assert!(prompt.contains("QUESTION: ...\n\nANSWER: ..."));
    assert!(prompt.contains("'NOT ENOUGH INFORMATION'"));
    assert!(prompt.contains("ONE SENTENCE"));
    assert!(prompt.ends_with("Here is the content of the webpage: Subnets split a VPC.\n"));
}

#[test]
fn block_format() {
    assert_eq!(
        transcript_block("https://x/a.html", "QUESTION: Q?\nANSWER: A."),
        "URL: https://x/a.html\nQ&A:\nQUESTION: Q?\nANSWER: A.\n\n"
    );
}

#[test]
fn generate_sends_system_and_user_messages() {
    let chat = FakeChat::replying("QUESTION: Q?\nANSWER: A.");
    let generator = QaGenerator::new(Box::new(chat.clone()));

    assert_eq!(
        generator.generate("content").as_deref(),
        Some("QUESTION: Q?\nANSWER: A.")
    );

    let calls = chat.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0], ChatMessage::system(SYSTEM_MESSAGE));
    assert_eq!(calls[0][1], ChatMessage::user(build_qa_prompt("content")));
}

#[test]
fn generate_failure_yields_none() {
    let generator = QaGenerator::new(Box::new(FakeChat::failing()));
    assert_eq!(generator.generate("content"), None);
}

#[test]
fn run_appends_blocks_from_cache_and_failures() {
    let dir = TempDir::new().expect("should create temp dir");
    let transcript = dir.path().join("qa.txt");
    fs::write(&transcript, "URL: https://x/old.html\nQ&A:\nNOT ENOUGH INFORMATION\n\n")
        .expect("should seed transcript");

    let mut cache = ContentCache::load(dir.path().join("cache.json")).expect("should load");
    cache.insert("https://x/a.html", "Page A");
    let mut fetcher = PageFetcher::new(HttpClient::default(), cache);

    let generator = QaGenerator::new(Box::new(FakeChat::replying("QUESTION: Q?\nANSWER: A.")));
    let links = vec!["https://x/a.html".to_string(), "not a url".to_string()];
    let stats = generator
        .run(&mut fetcher, &links, None, &transcript)
        .expect("run should succeed");

    assert_eq!(
        stats,
        GenerationStats {
            generated: 1,
            unfetched: 1,
            failed: 0
        }
    );
    let written = fs::read_to_string(&transcript).expect("should read transcript");
    assert_eq!(
        written,
        "URL: https://x/old.html\nQ&A:\nNOT ENOUGH INFORMATION\n\n\
         URL: https://x/a.html\nQ&A:\nQUESTION: Q?\nANSWER: A.\n\n\
         URL: not a url\nQ&A:\nNOT ENOUGH INFORMATION\n\n"
    );
}

#[test]
fn run_writes_nothing_for_failed_completion() {
    let dir = TempDir::new().expect("should create temp dir");
    let transcript = dir.path().join("qa.txt");

    let mut cache = ContentCache::load(dir.path().join("cache.json")).expect("should load");
    cache.insert("https://x/a.html", "Page A");
    let mut fetcher = PageFetcher::new(HttpClient::default(), cache);

    let generator = QaGenerator::new(Box::new(FakeChat::failing()));
    let stats = generator
        .run(&mut fetcher, &["https://x/a.html".to_string()], None, &transcript)
        .expect("run should succeed");

    assert_eq!(stats.failed, 1);
    assert_eq!(fs::read_to_string(&transcript).expect("should read"), "");
}

#[cfg(target_os = "linux")]
#[test]
fn run_stops_at_first_transcript_write_failure() {
    let dir = TempDir::new().expect("should create temp dir");
    let mut cache = ContentCache::load(dir.path().join("cache.json")).expect("should load");
    cache.insert("https://x/a.html", "Page A");
    cache.insert("https://x/b.html", "Page B");
    let mut fetcher = PageFetcher::new(HttpClient::default(), cache);

    let chat = FakeChat::replying("QUESTION: Q?\nANSWER: A.");
    let generator = QaGenerator::new(Box::new(chat.clone()));
    let links = vec!["https://x/a.html".to_string(), "https://x/b.html".to_string()];

    // Every write to /dev/full fails with ENOSPC
    let result = generator.run(&mut fetcher, &links, None, Path::new("/dev/full"));

    assert!(matches!(result, Err(crate::RagError::Io(_))));
    assert_eq!(chat.calls().len(), 1);
}
