//! Terminal conversation driver for scripted and interactive calls.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_trait::async_trait;

use crate::core::ToolOutput;

use super::ConversationDriver;

/// Prints what the assistant would say instead of synthesizing speech
#[derive(Debug, Default)]
pub struct ConsoleDriver {
    ended: AtomicBool,
}

impl ConsoleDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the call has been disconnected
    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConversationDriver for ConsoleDriver {
    async fn speak(&self, text: &str) -> Result<()> {
        println!("🤖 {}", text);
        Ok(())
    }

    async fn end_call(&self) -> Result<()> {
        self.ended.store(true, Ordering::SeqCst);
        println!("📴 Call ended");
        Ok(())
    }

    async fn tool_result(&self, output: &ToolOutput) -> Result<()> {
        match output {
            ToolOutput::Text(text) => println!("   ↳ tool: {}", text),
            ToolOutput::Flag(flag) => println!("   ↳ tool: {}", flag),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_end_call_sets_flag() {
        let driver = ConsoleDriver::new();
        assert!(!driver.has_ended());
        driver.end_call().await.unwrap();
        assert!(driver.has_ended());
    }
}
