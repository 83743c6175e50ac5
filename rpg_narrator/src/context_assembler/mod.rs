//! Context Assembler - Builds the narrator prompt from engine state.
//!
//! The assembler only reads. It takes a snapshot of the character, the
//! catalog entries it references and the running encounter (if any) and
//! renders them into a prompt. Nothing it produces flows back into numbers.

use rpg_rules::combat::CombatState;
use rpg_rules::{Catalog, Character};
use serde::{Deserialize, Serialize};

/// Emoji keys the narrator may pick from.
pub const EMOJI_KEYS: &[&str] = &[
    "default", "happy", "laugh", "sad", "cry", "angry", "love", "funny", "confused",
    "surprised", "shocked", "thinking", "sleepy", "relaxed", "confident", "cool", "playful",
    "embarrassed", "wink",
];

/// Knobs for prompt assembly.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Conversation turns included in the prompt.
    pub history_turns: usize,
    /// Combat log lines included in the prompt.
    pub combat_log_lines: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_turns: 3,
            combat_log_lines: 6,
        }
    }
}

/// Who said a line of conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Narrator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: Speaker,
    pub message: String,
}

/// Builds [`NarrationContext`] values.
pub struct ContextAssembler {
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(config: ContextConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ContextConfig::default())
    }

    /// Assemble everything the narrator needs for one reply.
    pub fn assemble(
        &self,
        catalog: &Catalog,
        character: &Character,
        combat: Option<&CombatState>,
        history: &[HistoryTurn],
        user_message: &str,
    ) -> NarrationContext {
        let location = catalog.location(character.current_location.as_str());
        let class = catalog
            .class(character.class.as_str())
            .map_or_else(|| character.class.to_string(), |c| c.name.clone());
        let personality = catalog
            .personality(character.personality.as_str())
            .map_or_else(|| character.personality.to_string(), |p| p.name.clone());

        NarrationContext {
            character: CharacterContext {
                name: character.name.clone(),
                class,
                personality,
                level: character.level,
                hp: character.stats.hp,
                max_hp: character.max_hp(),
                mp: character.stats.mp,
                max_mp: character.max_mp(),
                gold: character.gold,
            },
            location: LocationContext {
                id: character.current_location.to_string(),
                name: location.map_or_else(
                    || character.current_location.to_string(),
                    |l| l.name.clone(),
                ),
                description: location.map(|l| l.description.clone()).unwrap_or_default(),
            },
            active_quests: character
                .active_quests(catalog)
                .into_iter()
                .map(|(_, def)| def.name.clone())
                .collect(),
            combat: combat.map(|state| CombatContext {
                enemy: state.enemy.name.clone(),
                enemy_hp: state.enemy.hp,
                enemy_max_hp: state.enemy.max_hp,
                active: state.active,
                recent_log: state.recent_log(self.config.combat_log_lines).to_vec(),
            }),
            history: history[history.len().saturating_sub(self.config.history_turns)..].to_vec(),
            user_message: user_message.to_string(),
        }
    }
}

/// The assembled context ready for prompt generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationContext {
    pub character: CharacterContext,
    pub location: LocationContext,
    pub active_quests: Vec<String>,
    pub combat: Option<CombatContext>,
    /// Most recent turns, oldest first.
    pub history: Vec<HistoryTurn>,
    pub user_message: String,
}

impl NarrationContext {
    /// Format the context as a prompt string.
    pub fn to_prompt_string(&self) -> String {
        let c = &self.character;
        let mut prompt = String::new();

        prompt.push_str("You are the narrator of a text role-playing game.\n\n");
        prompt.push_str("## Rules\n");
        prompt.push_str("1. Describe what happens; never decide numbers.\n");
        prompt.push_str("2. Damage, experience and loot are already computed by the game.\n");
        prompt.push_str("3. Use the numbers given below as they are.\n");
        prompt.push_str("4. Suggest what the player might do next, without inventing outcomes.\n");
        prompt.push_str(&format!("5. Stay true to the hero's personality: {}.\n\n", c.personality));

        prompt.push_str("## Character\n");
        prompt.push_str(&format!(
            "- {} the {} (level {})\n- HP: {}/{}\n- MP: {}/{}\n- Gold: {}\n- Location: {}\n\n",
            c.name, c.class, c.level, c.hp, c.max_hp, c.mp, c.max_mp, c.gold, self.location.name
        ));
        if !self.location.description.is_empty() {
            prompt.push_str(&format!("{}\n\n", self.location.description));
        }

        prompt.push_str("## Active Quests\n");
        if self.active_quests.is_empty() {
            prompt.push_str("None\n");
        } else {
            prompt.push_str(&self.active_quests.join(", "));
            prompt.push('\n');
        }
        prompt.push('\n');

        if let Some(combat) = &self.combat {
            prompt.push_str(&format!(
                "## Combat ({})\n{}: HP {}/{}\n",
                if combat.active { "ongoing" } else { "over" },
                combat.enemy,
                combat.enemy_hp,
                combat.enemy_max_hp
            ));
            for line in &combat.recent_log {
                prompt.push_str(&format!("- {line}\n"));
            }
            prompt.push('\n');
        }

        if !self.history.is_empty() {
            prompt.push_str("## Recent Conversation\n");
            for turn in &self.history {
                let who = match turn.role {
                    Speaker::User => "Player",
                    Speaker::Narrator => "Narrator",
                };
                prompt.push_str(&format!("{who}: {}\n", turn.message));
            }
            prompt.push('\n');
        }

        prompt.push_str("## Player Says\n");
        prompt.push_str(&self.user_message);
        prompt.push_str("\n\n");

        prompt.push_str("Reply with a single JSON object and nothing else:\n");
        prompt.push_str(&format!(
            "{{\"message\": \"your narration\", \"emoji\": \"one of the emoji keys\", \
             \"scene\": \"{}\", \"mcp_command\": \"\"}}\n",
            self.location.id
        ));
        prompt.push_str(&format!("Emoji keys: {}\n", EMOJI_KEYS.join(", ")));
        prompt.push_str("Keep the scene unchanged unless the story moves elsewhere.\n");

        prompt
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterContext {
    pub name: String,
    pub class: String,
    pub personality: String,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    pub mp: u32,
    pub max_mp: u32,
    pub gold: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationContext {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatContext {
    pub enemy: String,
    pub enemy_hp: u32,
    pub enemy_max_hp: u32,
    pub active: bool,
    pub recent_log: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rpg_rules::{ClassId, CombatEngine, EnemyId, PersonalityId};

    fn hero(catalog: &Catalog) -> Character {
        Character::create(
            catalog,
            "acct",
            "Gwen",
            &ClassId::from("mage"),
            &PersonalityId::from("wise"),
            Utc::now(),
        )
        .unwrap()
    }

    fn turn(role: Speaker, message: &str) -> HistoryTurn {
        HistoryTurn {
            role,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_assemble_character_sheet() {
        let catalog = Catalog::builtin().unwrap();
        let hero = hero(&catalog);
        let context =
            ContextAssembler::with_defaults().assemble(&catalog, &hero, None, &[], "Hello");

        assert_eq!(context.character.class, "Mage");
        assert_eq!(context.character.personality, "Wise");
        assert_eq!(context.location.name, "Starter Village");
        assert_eq!(context.active_quests, vec!["First Steps".to_string()]);
        assert!(context.combat.is_none());
    }

    #[test]
    fn test_history_is_truncated() {
        let catalog = Catalog::builtin().unwrap();
        let hero = hero(&catalog);
        let history: Vec<_> = (0..5)
            .map(|i| turn(Speaker::User, &format!("line {i}")))
            .collect();
        let context =
            ContextAssembler::with_defaults().assemble(&catalog, &hero, None, &history, "next");

        assert_eq!(context.history.len(), 3);
        assert_eq!(context.history[0].message, "line 2");
    }

    #[test]
    fn test_prompt_includes_combat_log() {
        let catalog = Catalog::builtin().unwrap();
        let hero = hero(&catalog);
        let combat = CombatEngine::new(&catalog)
            .start_combat(&hero, &EnemyId::from("wolf"))
            .unwrap();
        let history = [
            turn(Speaker::User, "I draw my staff"),
            turn(Speaker::Narrator, "The wind howls"),
        ];
        let prompt = ContextAssembler::with_defaults()
            .assemble(&catalog, &hero, Some(&combat), &history, "Attack!")
            .to_prompt_string();

        assert!(prompt.contains("Gwen the Mage (level 1)"));
        assert!(prompt.contains("HP: 80/80"));
        assert!(prompt.contains("Wolf: HP 70/70"));
        assert!(prompt.contains("You encounter"));
        assert!(prompt.contains("Narrator: The wind howls"));
        assert!(prompt.contains("Attack!"));
        assert!(prompt.contains("\"scene\": \"village\""));
    }
}
