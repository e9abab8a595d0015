//! Robots.txt rules for one site and one user agent

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// robots.txt content bound to the agent token it is evaluated for
#[derive(Debug, Clone)]
pub struct RobotsRules {
    /// Raw robots.txt content (empty means allow all)
    content: String,
    agent: String,
}

impl RobotsRules {
    pub fn from_content(content: &str, agent: &str) -> Self {
        Self {
            content: content.to_string(),
            agent: agent.to_string(),
        }
    }

    /// Used when robots.txt is missing, unreachable or not honored
    pub fn allow_all(agent: &str) -> Self {
        Self::from_content("", agent)
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Checks a full URL (or a path) against the rules
    pub fn is_allowed(&self, url: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, &self.agent, url)
    }

    /// `Crawl-delay` of the group matching the agent, falling back to `*`
    ///
    /// Consecutive `User-agent` lines form one group; the group ends at the
    /// next `User-agent` line that follows a rule line.
    pub fn crawl_delay(&self) -> Option<Duration> {
        let agent = self.agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut specific = None;
        let mut wildcard = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                if in_rules {
                    group.clear();
                    in_rules = false;
                }
                group.push(value.to_lowercase());
                continue;
            }

            in_rules = true;
            if key != "crawl-delay" {
                continue;
            }
            let Ok(secs) = value.parse::<f64>() else {
                continue;
            };
            if !secs.is_finite() || secs < 0.0 {
                continue;
            }

            if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                specific = Some(secs);
            } else if group.iter().any(|ua| ua == "*") {
                wildcard = Some(secs);
            }
        }

        specific.or(wildcard).map(Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let robots = RobotsRules::allow_all("TestBot");
        assert!(robots.is_allowed("https://example.com/admin"));
        assert_eq!(robots.crawl_delay(), None);
    }

    #[test]
    fn test_disallow_all() {
        let robots = RobotsRules::from_content("User-agent: *\nDisallow: /", "TestBot");
        assert!(!robots.is_allowed("https://example.com/"));
        assert!(!robots.is_allowed("https://example.com/page"));
    }

    #[test]
    fn test_disallow_prefix() {
        let robots = RobotsRules::from_content("User-agent: *\nDisallow: /admin", "TestBot");
        assert!(robots.is_allowed("https://example.com/"));
        assert!(!robots.is_allowed("https://example.com/admin/users"));
    }

    #[test]
    fn test_allow_overrides_longer_match() {
        let content = "User-agent: *\nDisallow: /private\nAllow: /private/public";
        let robots = RobotsRules::from_content(content, "TestBot");
        assert!(!robots.is_allowed("https://example.com/private"));
        assert!(robots.is_allowed("https://example.com/private/public"));
    }

    #[test]
    fn test_specific_agent_group() {
        let content = "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nAllow: /";
        assert!(RobotsRules::from_content(content, "GoodBot").is_allowed("https://example.com/x"));
        assert!(!RobotsRules::from_content(content, "BadBot").is_allowed("https://example.com/x"));
    }

    #[test]
    fn test_garbage_allows() {
        let robots = RobotsRules::from_content("This is not valid robots.txt {{{", "TestBot");
        assert!(robots.is_allowed("https://example.com/any/path"));
    }

    #[test]
    fn test_crawl_delay_wildcard() {
        let robots =
            RobotsRules::from_content("User-agent: *\nCrawl-delay: 2.5\nDisallow: /admin", "Bot");
        assert_eq!(robots.crawl_delay(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_crawl_delay_prefers_specific_group() {
        let content = "User-agent: TestBot\nCrawl-delay: 5\n\nUser-agent: *\nCrawl-delay: 10";
        assert_eq!(
            RobotsRules::from_content(content, "TestBot").crawl_delay(),
            Some(Duration::from_secs(5))
        );
        assert_eq!(
            RobotsRules::from_content(content, "OtherBot").crawl_delay(),
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_crawl_delay_shared_group() {
        let content = "User-agent: BotA\nUser-agent: BotB\nCrawl-delay: 3";
        assert_eq!(
            RobotsRules::from_content(content, "BotB").crawl_delay(),
            Some(Duration::from_secs(3))
        );
        assert_eq!(RobotsRules::from_content(content, "BotC").crawl_delay(), None);
    }

    #[test]
    fn test_crawl_delay_case_insensitive_key() {
        let robots = RobotsRules::from_content("User-agent: TestBot\ncrawl-delay: 7", "testbot");
        assert_eq!(robots.crawl_delay(), Some(Duration::from_secs(7)));
    }
}
