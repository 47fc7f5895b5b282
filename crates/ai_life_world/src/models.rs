//! Character records read at world entry, and the personality tags they carry.

use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const MAX_VITAL: u8 = 100;
pub const DEFAULT_HEALTH: u8 = 100;
pub const DEFAULT_HUNGER: u8 = 0;
pub const UNKNOWN_PERSONALITY_PROFILE: &str = "一个普通而神秘的陌生人";

pub const HAIR_COLOR_PALETTE: [&str; 5] = ["#FF0000", "#00FF00", "#0000FF", "#FFFF00", "#00FFFF"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CharacterError {
    #[error("character name is empty")]
    EmptyName,
    #[error("unknown personality tag: {tag}")]
    UnknownPersonality { tag: String },
    #[error("invalid character record: {message}")]
    InvalidRecord { message: String },
}

/// Fixed set of personality tags an agent can carry.
///
/// The sixteen MBTI types come with a descriptive profile; the five temperaments are the
/// tags handed out by the character generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Personality {
    #[serde(rename = "INTJ")]
    Intj,
    #[serde(rename = "INTP")]
    Intp,
    #[serde(rename = "ENTJ")]
    Entj,
    #[serde(rename = "ENTP")]
    Entp,
    #[serde(rename = "INFJ")]
    Infj,
    #[serde(rename = "INFP")]
    Infp,
    #[serde(rename = "ENFJ")]
    Enfj,
    #[serde(rename = "ENFP")]
    Enfp,
    #[serde(rename = "ISTJ")]
    Istj,
    #[serde(rename = "ISFJ")]
    Isfj,
    #[serde(rename = "ESTJ")]
    Estj,
    #[serde(rename = "ESFJ")]
    Esfj,
    #[serde(rename = "ISTP")]
    Istp,
    #[serde(rename = "ISFP")]
    Isfp,
    #[serde(rename = "ESTP")]
    Estp,
    #[serde(rename = "ESFP")]
    Esfp,
    Friendly,
    Grumpy,
    Curious,
    Lazy,
    Energetic,
}

impl Personality {
    pub const MBTI: [Personality; 16] = [
        Personality::Intj,
        Personality::Intp,
        Personality::Entj,
        Personality::Entp,
        Personality::Infj,
        Personality::Infp,
        Personality::Enfj,
        Personality::Enfp,
        Personality::Istj,
        Personality::Isfj,
        Personality::Estj,
        Personality::Esfj,
        Personality::Istp,
        Personality::Isfp,
        Personality::Estp,
        Personality::Esfp,
    ];

    pub const TEMPERAMENTS: [Personality; 5] = [
        Personality::Friendly,
        Personality::Grumpy,
        Personality::Curious,
        Personality::Lazy,
        Personality::Energetic,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Personality::Intj => "INTJ",
            Personality::Intp => "INTP",
            Personality::Entj => "ENTJ",
            Personality::Entp => "ENTP",
            Personality::Infj => "INFJ",
            Personality::Infp => "INFP",
            Personality::Enfj => "ENFJ",
            Personality::Enfp => "ENFP",
            Personality::Istj => "ISTJ",
            Personality::Isfj => "ISFJ",
            Personality::Estj => "ESTJ",
            Personality::Esfj => "ESFJ",
            Personality::Istp => "ISTP",
            Personality::Isfp => "ISFP",
            Personality::Estp => "ESTP",
            Personality::Esfp => "ESFP",
            Personality::Friendly => "Friendly",
            Personality::Grumpy => "Grumpy",
            Personality::Curious => "Curious",
            Personality::Lazy => "Lazy",
            Personality::Energetic => "Energetic",
        }
    }

    /// Descriptive text block injected into prompts in place of the bare tag.
    pub fn profile(self) -> &'static str {
        match self {
            Personality::Intj => "建筑师 (INTJ): 富有想象力和战略性的思想家，一切皆在计划之中。",
            Personality::Intp => "逻辑学家 (INTP): 具有创造力的发明家，对知识有不竭的渴望。",
            Personality::Entj => {
                "指挥官 (ENTJ): 大胆，富有想象力且意志强大的领导者，总是能找到或创造解决方法。"
            }
            Personality::Entp => "辩论家 (ENTP): 聪明好奇的思想者，不会放弃任何智力上的挑战。",
            Personality::Infj => {
                "提倡者 (INFJ): 安静而神秘，同时鼓舞人心且不知疲倦的理想主义者。"
            }
            Personality::Infp => {
                "调停者 (INFP): 诗意，善良的利他主义者，总是热情地为正当理由提供帮助。"
            }
            Personality::Enfj => "主人公 (ENFJ): 富有魅力，鼓舞人心的领导者，有能力使听众着迷。",
            Personality::Enfp => {
                "竞选者 (ENFP): 热情，有创造力，爱社交的自由人，总能找到理由微笑。"
            }
            Personality::Istj => "物流师 (ISTJ): 实际，注重事实的个人，可靠性不容怀疑。",
            Personality::Isfj => {
                "守卫者 (ISFJ): 非常专注而温暖的守护者，时刻准备着保护爱着的人们。"
            }
            Personality::Estj => "总经理 (ESTJ): 出色的管理者，在管理事情或人的方面无与伦比。",
            Personality::Esfj => {
                "执政官 (ESFJ): 极有同情心，爱社交，受欢迎的人们，总是热心提供帮助。"
            }
            Personality::Istp => "鉴赏家 (ISTP): 大胆而实际的实验家，擅长使用各种形式的工具。",
            Personality::Isfp => {
                "探险家 (ISFP): 灵活有魅力的艺术家，时刻准备着探索和体验新鲜事物。"
            }
            Personality::Estp => {
                "企业家 (ESTP): 聪明，精力充沛，善于感知的人们，真心享受生活在边缘。"
            }
            Personality::Esfp => {
                "表演者 (ESFP): 自发的，精力充沛而热情的表演者，生活在他们周围永不无聊。"
            }
            Personality::Friendly => "友善 (Friendly): 待人热情，乐于主动和身边的每个人打招呼。",
            Personality::Grumpy => "暴躁 (Grumpy): 脾气不好，说话直接，不喜欢被人打扰。",
            Personality::Curious => "好奇 (Curious): 对周围的一切充满好奇，喜欢四处探索和提问。",
            Personality::Lazy => "慵懒 (Lazy): 能不动就不动，更愿意待在原地休息。",
            Personality::Energetic => "活力 (Energetic): 精力旺盛，总是停不下来，喜欢到处走动。",
        }
    }

    pub fn is_mbti(self) -> bool {
        Self::MBTI.contains(&self)
    }

    pub fn random_mbti<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        pick(rng, &Self::MBTI)
    }

    pub fn random_temperament<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        pick(rng, &Self::TEMPERAMENTS)
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Personality {
    type Err = CharacterError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Self::MBTI
            .iter()
            .chain(Self::TEMPERAMENTS.iter())
            .copied()
            .find(|personality| personality.tag().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| CharacterError::UnknownPersonality {
                tag: trimmed.to_string(),
            })
    }
}

/// Profile text for a raw tag, falling back to a neutral description for unknown tags.
pub fn personality_profile(tag: &str) -> &'static str {
    tag.parse::<Personality>()
        .map(Personality::profile)
        .unwrap_or(UNKNOWN_PERSONALITY_PROFILE)
}

fn pick<R: RngCore + ?Sized, T: Copy>(rng: &mut R, items: &[T]) -> T {
    let index = rng.next_u32() as usize % items.len();
    items[index]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vitals {
    pub health: u8,
    /// 0 = full, 100 = starving.
    pub hunger: u8,
}

impl Vitals {
    pub fn new(health: i64, hunger: i64) -> Self {
        Self {
            health: clamp_vital(health),
            hunger: clamp_vital(hunger),
        }
    }
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            health: DEFAULT_HEALTH,
            hunger: DEFAULT_HUNGER,
        }
    }
}

fn clamp_vital(value: i64) -> u8 {
    value.clamp(0, MAX_VITAL as i64) as u8
}

/// Character record as persisted by the ledger collaborator.
///
/// Read once at world entry; vitals changes during play are never written back from here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub name: String,
    pub personality: String,
    pub health: i64,
    pub hunger: i64,
    #[serde(default, rename = "hairColor", alias = "hair_color")]
    pub hair_color: String,
    #[serde(default, rename = "hasGlasses", alias = "has_glasses")]
    pub has_glasses: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl CharacterRecord {
    /// Rolls a fresh character: random cosmetics and temperament, full health, not hungry.
    pub fn generate<R: RngCore + ?Sized>(
        name: &str,
        owner: Option<String>,
        rng: &mut R,
    ) -> Result<Self, CharacterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CharacterError::EmptyName);
        }
        let hair_color = pick(rng, &HAIR_COLOR_PALETTE).to_string();
        let has_glasses = rng.next_u32() % 2 == 1;
        let personality = Personality::random_temperament(rng);
        Ok(Self {
            name: name.to_string(),
            personality: personality.tag().to_string(),
            health: DEFAULT_HEALTH as i64,
            hunger: DEFAULT_HUNGER as i64,
            hair_color,
            has_glasses,
            owner,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, CharacterError> {
        serde_json::from_str(raw).map_err(|err| CharacterError::InvalidRecord {
            message: err.to_string(),
        })
    }

    pub fn parsed_personality(&self) -> Result<Personality, CharacterError> {
        self.personality.parse()
    }

    pub fn vitals(&self) -> Vitals {
        Vitals::new(self.health, self.hunger)
    }
}
