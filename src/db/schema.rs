//! SQL schema definitions

pub const SCHEMA: &str = r#"
-- Prompts table
CREATE TABLE IF NOT EXISTS prompts (
    id TEXT PRIMARY KEY,
    system_prompt TEXT NOT NULL,
    user_prompt TEXT NOT NULL,
    model TEXT NOT NULL,
    response TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    hits INTEGER NOT NULL DEFAULT 0 CHECK (hits >= 0)
);

-- Fork lineage table
CREATE TABLE IF NOT EXISTS prompt_forks (
    id TEXT PRIMARY KEY,
    parent_id TEXT NOT NULL,
    forked_at TEXT NOT NULL,
    FOREIGN KEY (id) REFERENCES prompts(id),
    FOREIGN KEY (parent_id) REFERENCES prompts(id)
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_prompts_created_at ON prompts(created_at DESC);
CREATE INDEX IF NOT EXISTS idx_prompts_hits ON prompts(hits DESC);
CREATE INDEX IF NOT EXISTS idx_prompt_forks_parent_id ON prompt_forks(parent_id);
"#;
