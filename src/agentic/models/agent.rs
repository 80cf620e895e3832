use serde::{Deserialize, Serialize};

/// Icons the client can render for an agent.
///
/// The registry sends icon names as plain strings; they are resolved once when
/// agents are loaded. Names outside this set fall back to [`AgentIcon::Building2`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AgentIcon {
    #[default]
    Building2,
    ShoppingBag,
    TrendingUp,
    Search,
    Zap,
    Bot,
    Brain,
    Briefcase,
    BookOpen,
    Sparkles,
}

impl AgentIcon {
    pub const ALL: [AgentIcon; 10] = [
        AgentIcon::Building2,
        AgentIcon::ShoppingBag,
        AgentIcon::TrendingUp,
        AgentIcon::Search,
        AgentIcon::Zap,
        AgentIcon::Bot,
        AgentIcon::Brain,
        AgentIcon::Briefcase,
        AgentIcon::BookOpen,
        AgentIcon::Sparkles,
    ];

    /// Resolve an icon name from the registry, falling back to the default icon.
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|icon| icon.name() == name)
            .unwrap_or_default()
    }

    pub fn name(self) -> &'static str {
        match self {
            AgentIcon::Building2 => "Building2",
            AgentIcon::ShoppingBag => "ShoppingBag",
            AgentIcon::TrendingUp => "TrendingUp",
            AgentIcon::Search => "Search",
            AgentIcon::Zap => "Zap",
            AgentIcon::Bot => "Bot",
            AgentIcon::Brain => "Brain",
            AgentIcon::Briefcase => "Briefcase",
            AgentIcon::BookOpen => "BookOpen",
            AgentIcon::Sparkles => "Sparkles",
        }
    }

    /// Single-glyph rendering used by text front-ends.
    pub fn glyph(self) -> &'static str {
        match self {
            AgentIcon::Building2 => "🏢",
            AgentIcon::ShoppingBag => "🛍",
            AgentIcon::TrendingUp => "📈",
            AgentIcon::Search => "🔎",
            AgentIcon::Zap => "⚡",
            AgentIcon::Bot => "🤖",
            AgentIcon::Brain => "🧠",
            AgentIcon::Briefcase => "💼",
            AgentIcon::BookOpen => "📖",
            AgentIcon::Sparkles => "✨",
        }
    }
}

/// Agent shape returned by `GET /api/agents`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentPublic {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

/// A selectable domain specialist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: AgentIcon,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        icon: AgentIcon,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            icon,
        }
    }

    pub fn to_public(&self) -> AgentPublic {
        AgentPublic {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            icon: self.icon.name().to_string(),
        }
    }
}

impl From<AgentPublic> for Agent {
    fn from(agent: AgentPublic) -> Self {
        Self {
            icon: AgentIcon::from_name(&agent.icon),
            id: agent.id,
            name: agent.name,
            description: agent.description,
        }
    }
}

/// The stock agent catalogue. The live registry stays authoritative; this list
/// seeds the in-memory backend.
pub fn builtin_agents() -> Vec<Agent> {
    vec![
        Agent::new(
            "hr-policies",
            "HR Policies Agent",
            "Human resources policies and procedures specialist",
            AgentIcon::Building2,
        ),
        Agent::new(
            "retail",
            "Retail Agent",
            "Retail operations and customer service expert",
            AgentIcon::ShoppingBag,
        ),
        Agent::new(
            "marketing",
            "Marketing Agent",
            "Marketing strategies and campaign optimization",
            AgentIcon::TrendingUp,
        ),
        Agent::new(
            "orthodox",
            "Orthodox Agent",
            "Orthodox biblical and theological insights",
            AgentIcon::Search,
        ),
        Agent::new(
            "deep-research",
            "DeepResearch Agent",
            "Advanced research and competitive intelligence",
            AgentIcon::Zap,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_icon_names_resolve() {
        for icon in AgentIcon::ALL {
            assert_eq!(AgentIcon::from_name(icon.name()), icon);
        }
        assert_eq!(AgentIcon::from_name(" Zap "), AgentIcon::Zap);
    }

    #[test]
    fn test_unknown_icon_falls_back_to_building() {
        assert_eq!(AgentIcon::from_name("Rocket"), AgentIcon::Building2);
        assert_eq!(AgentIcon::from_name(""), AgentIcon::Building2);
        // Names are case-sensitive, like the icon set they come from
        assert_eq!(AgentIcon::from_name("zap"), AgentIcon::Building2);
    }

    #[test]
    fn test_agent_from_public_resolves_icon() {
        let public: AgentPublic = serde_json::from_str(
            r#"{"id":"retail","name":"Retail Agent","description":"Shops","icon":"ShoppingBag"}"#,
        )
        .unwrap();
        let agent = Agent::from(public);
        assert_eq!(agent.id, "retail");
        assert_eq!(agent.icon, AgentIcon::ShoppingBag);
    }

    #[test]
    fn test_builtin_agents_have_unique_ids() {
        let agents = builtin_agents();
        let mut ids: Vec<&str> = agents.iter().map(|a| a.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), agents.len());
        assert_eq!(agents[0].id, "hr-policies");
    }
}
