//! Smart-home plan assembly: a pure, total function from goal flags to a
//! phased work-breakdown text with an accumulated minimum budget. No state,
//! no failure path; callers decide when to invoke it and how to surface the
//! output.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// Recommended devices, priced for the secondhand market.
pub const RECOMMENDED_VOICE_ASSISTANT: &str = "Amazon Echo Show (used)";
pub const RECOMMENDED_HUB: &str = "SwitchBot Hub Mini (used)";
pub const RECOMMENDED_STREAMING: &str = "Amazon Fire TV Stick (used)";
pub const RECOMMENDED_CURTAIN: &str = "SwitchBot Curtain";

const HUB_CHOICE_NOTE: &str = "Nature Remo Mini is popular too, but for curtain automation and future expansion, SwitchBot is the clear pick!";

// Minimum budget increments per phase, in yen.
const PHASE_1_BUDGET: i64 = 2000;
const PHASE_2_BUDGET: i64 = 2000;
const PHASE_3_BUDGET: i64 = 2000;
const PHASE_4_BUDGET: i64 = 6000;

const NO_GOALS_PROMPT: &str = "Hmm, sounds like you haven't settled on a concrete goal yet! Tell me what you're after first - \"turn the lights on by voice\", \"automate my curtains\", anything like that - and I'll map out the route.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalFlag {
    BasicVoiceControl,
    MediaVoiceControl,
    CurtainAutomation,
}

/// Assemble the phased smart-home plan for a set of goal flags.
///
/// Each phase is gated independently on flag membership; only Phase 4
/// additionally depends on Phase 2's inclusion (curtain hardware is useless
/// without the hub). When Phase 2 is missing, Phase 4 degrades to a
/// prerequisite warning and contributes no budget.
pub fn assemble_plan(goals: &HashSet<GoalFlag>) -> String {
    let mut plan = String::from(
        "Alright, here's the shortest route to the easy life, straight from my own experience! 😎\n\n",
    );
    let mut budget: i64 = 0;
    let mut phases_included: Vec<u8> = Vec::new();

    // Phase 1: the voice assistant itself. Every goal starts here.
    if !goals.is_empty() {
        phases_included.push(1);
        plan.push_str(&format!(
            "**Phase 1: get yourself a voice sidekick! (budget: ~3000 yen)**\n\
             1. Hunt down a \"{}\" on the used market. Kitchen timers, news and weather on a \"good morning\" - that alone changes your day.\n\
             \x20  * Music, news and timers are covered from here on.\n\n",
            RECOMMENDED_VOICE_ASSISTANT
        ));
        budget += PHASE_1_BUDGET;
    }

    // Phase 2: the IR hub for aircon / TV / lights.
    if goals.contains(&GoalFlag::BasicVoiceControl) {
        phases_included.push(2);
        plan.push_str(&format!(
            "**Phase 2: hack every IR remote in the house by voice! (budget: ~3000 yen)**\n\
             2. Grab a \"{}\" secondhand. It becomes the boss of all your infrared remotes.\n\
             \x20  * {}\n\
             3. Connect it to Wi-Fi in the vendor app and register the TV, aircon and light remotes. The app walks you through it.\n\
             4. Enable the SwitchBot skill in the Alexa app from Phase 1. Now \"Alexa, turn on the TV\" just works.\n\n",
            RECOMMENDED_HUB, HUB_CHOICE_NOTE
        ));
        budget += PHASE_2_BUDGET;
    }

    // Phase 3: streaming by voice.
    if goals.contains(&GoalFlag::MediaVoiceControl) {
        phases_included.push(3);
        plan.push_str(&format!(
            "**Phase 3: play YouTube by voice too! (budget: ~3000 yen)**\n\
             5. Find a \"{}\" secondhand and plug it into the TV.\n\
             6. Set it up and link it with Alexa. \"Alexa, play something on YouTube\" becomes real.\n\n",
            RECOMMENDED_STREAMING
        ));
        budget += PHASE_3_BUDGET;
    }

    // Phase 4: curtains. Useless without the Phase 2 hub.
    if goals.contains(&GoalFlag::CurtainAutomation) {
        if !phases_included.contains(&2) {
            plan.push_str(&format!(
                "**Heads up! Curtain automation needs the \"{}\" - start from Phase 2 first.**\n\n",
                RECOMMENDED_HUB
            ));
        } else {
            phases_included.push(4);
            plan.push_str(&format!(
                "**Phase 4: curtains that open and close themselves! (budget: ~7000 yen per rail)**\n\
                 7. Get the \"{}\". Pick the type (U-rail or square rail) to match your curtain rail.\n\
                 8. Add the curtain device in the app and link it with the {}.\n\
                 9. Create a scene: \"open the curtains at 7am\", or \"Alexa, close the curtains\".\n\n",
                RECOMMENDED_CURTAIN, RECOMMENDED_HUB
            ));
            budget += PHASE_4_BUDGET;
        }
    }

    if phases_included.is_empty() {
        return NO_GOALS_PROMPT.to_string();
    }

    plan.push_str(&format!(
        "**---\nThat's about it! Even doing every phase you picked, the minimum total lands around {} yen. Concrete enough to picture now, right? 👍**",
        budget
    ));

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(list: &[GoalFlag]) -> HashSet<GoalFlag> {
        list.iter().copied().collect()
    }

    #[test]
    fn empty_goals_yield_the_fixed_prompt() {
        let plan = assemble_plan(&HashSet::new());
        assert_eq!(plan, NO_GOALS_PROMPT);
        assert!(!plan.contains("Phase"));
    }

    #[test]
    fn basic_goal_covers_phases_one_and_two() {
        let plan = assemble_plan(&flags(&[GoalFlag::BasicVoiceControl]));
        assert!(plan.contains("Phase 1"));
        assert!(plan.contains("Phase 2"));
        assert!(!plan.contains("Phase 3"));
        assert!(!plan.contains("Phase 4"));
        assert!(plan.contains("around 4000 yen"));
    }

    #[test]
    fn curtain_without_hub_warns_and_skips_phase_four_budget() {
        let plan = assemble_plan(&flags(&[GoalFlag::CurtainAutomation]));
        assert!(plan.contains("Heads up!"));
        assert!(plan.contains("start from Phase 2 first"));
        assert!(!plan.contains("Phase 4:"));
        // Phase 1 only: the 6000-yen curtain increment must not appear.
        assert!(plan.contains("around 2000 yen"));
    }

    #[test]
    fn full_plan_includes_all_phases_in_order_with_summed_budget() {
        let plan = assemble_plan(&flags(&[
            GoalFlag::BasicVoiceControl,
            GoalFlag::MediaVoiceControl,
            GoalFlag::CurtainAutomation,
        ]));

        let p1 = plan.find("Phase 1").unwrap();
        let p2 = plan.find("Phase 2").unwrap();
        let p3 = plan.find("Phase 3").unwrap();
        let p4 = plan.find("Phase 4").unwrap();
        assert!(p1 < p2 && p2 < p3 && p3 < p4);

        assert!(!plan.contains("Heads up!"));
        assert!(plan.contains("around 12000 yen")); // 2000 * 3 + 6000
    }

    #[test]
    fn media_only_skips_the_hub() {
        let plan = assemble_plan(&flags(&[GoalFlag::MediaVoiceControl]));
        assert!(plan.contains("Phase 1"));
        assert!(!plan.contains("Phase 2"));
        assert!(plan.contains("Phase 3"));
        assert!(plan.contains("around 4000 yen"));
    }
}
