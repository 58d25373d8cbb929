use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Every log line opens with `YYYY-MM-DD HH:MM:SS `. Lines without the
    /// prefix are not log events.
    pub static ref RE_DATETIME: Regex =
        Regex::new(r"^(?P<date>\d{4}-\d{2}-\d{2}) (?P<time>\d{2}:\d{2}:\d{2}) ").unwrap();
}

const HIT_ROLL_BODY: &str = r"(?P<outcome>HIT|MISS(?:ED)?) (?P<target>[^.!]+?)!+ Your (?P<ability>.+?) power (?:had a \d+(?:\.\d+)?% chance to hit, you rolled a \d+(?:\.\d+)?|was forced to hit by streakbreaker)\.";

const DAMAGE_BODY: &str = r"You hit (?P<target>[^:]+?) with your (?P<ability>[^:]+?)(?:: (?P<desc>[^:]+?))? for (?P<value>\d+(?:\.\d+)?) points of (?P<damage_type>.+?) damage(?: \((?P<flair>[^)]+)\))?(?: over time)?\.";

const FOE_HIT_ROLL_BODY: &str = r"(?P<enemy>.+?) (?P<outcome>HITS|MISSES)!? (?:you! )?(?:their )?(?P<ability>.+?) power had a \d+(?:\.\d+)?% chance to hit(?:, but|, and| and) rolled a \d+(?:\.\d+)?\.";

const FOE_DAMAGE_BODY: &str = r"(?P<enemy>[^:]+?) hits (?P<defender>you|.+?) with their (?P<ability>[^:]+?)(?:: (?P<desc>[^:]+?))? for (?P<value>\d+(?:\.\d+)?) points of (?P<damage_type>.+?) damage(?: \((?P<flair>[^)]+)\))?(?: over time)?\.";

/// The grammar table for one player identity. Patterns whose text embeds the
/// player's own name are re-derived by [`PatternSet::compile`] whenever
/// identity changes, so the set as a whole is rebuilt rather than patched.
///
/// Classification tries the members in the order the classifier lists them;
/// the first match wins.
pub struct PatternSet {
    pub ability_activate: Regex,
    pub pet_hit_roll: Regex,
    pub hit_roll: Regex,
    pub pet_damage: Regex,
    pub damage: Regex,
    pub foe_pet_hit_roll: Regex,
    pub foe_hit_roll: Regex,
    pub foe_autohit: Regex,
    pub foe_damage: Regex,
    pub foe_pet_damage: Regex,
    pub reward_both: Regex,
    pub reward_exp: Regex,
    pub reward_inf: Regex,
    pub player_name: Regex,
    pub player_name_backup: Regex,
    pub command: Regex,
}

impl PatternSet {
    /// Compiles the table for `player_name` (may be empty while identity is
    /// still unresolved). All patterns are anchored; the datetime prefix is
    /// stripped before they run.
    pub fn compile(player_name: &str) -> Self {
        // Some damage lines echo with the player's own name as a pet-style
        // prefix; accept and discard it once identity is known.
        let self_prefix = if player_name.is_empty() {
            String::new()
        } else {
            format!(r"(?:{}:\s+)?", regex::escape(player_name))
        };

        Self {
            ability_activate: compile(r"You activated the (?P<ability>.+?) power\."),
            pet_hit_roll: compile(&format!(r"(?P<pet>[^:]+?):\s+{HIT_ROLL_BODY}")),
            hit_roll: compile(HIT_ROLL_BODY),
            pet_damage: compile(&format!(r"(?P<pet>[^:]+?):\s+{DAMAGE_BODY}")),
            damage: compile(&format!("{self_prefix}{DAMAGE_BODY}")),
            foe_pet_hit_roll: compile(&format!(r"(?P<pet>[^:]+?):\s+{FOE_HIT_ROLL_BODY}")),
            foe_hit_roll: compile(FOE_HIT_ROLL_BODY),
            foe_autohit: compile(
                r"(?P<enemy>.+?) HITS you! (?:their )?(?P<ability>.+?) power (?:is|was) autohit\.",
            ),
            foe_damage: compile(FOE_DAMAGE_BODY),
            foe_pet_damage: compile(&format!(r"(?P<pet>[^:]+?):\s+{FOE_DAMAGE_BODY}")),
            reward_both: compile(
                r"You gain (?P<exp>[\d,]+) experience and (?P<inf>[\d,]+) (?:influence|infamy|information)\.",
            ),
            reward_exp: compile(r"You gain (?P<exp>[\d,]+) experience\."),
            reward_inf: compile(r"You gain (?P<inf>[\d,]+) (?:influence|infamy|information)\."),
            player_name: compile(
                r"(?:Welcome to City of Heroes|Now entering the Rogue Isles)[^,]*, (?P<name>.+?)!",
            ),
            player_name_backup: compile(
                r"(?:HIT|MISS(?:ED)?) (?P<name>[^.!]+?)!+ Your (?:Stamina|Health) power is autohit\.",
            ),
            command: compile(
                r"\[(?:Local|SuperGroup)\] (?P<player>[^:]+?): .*?##(?P<command>\S+)(?: (?P<value>.+))?$",
            ),
        }
    }
}

fn compile(body: &str) -> Regex {
    Regex::new(&format!("^{body}")).unwrap()
}
