//! Fixed instruction prompts.

/// Sent with every uploaded plan to obtain short review feedback.
pub const FEEDBACK_PROMPT: &str = "\
Review this floor plan and reply with short, actionable bullet points only. \
Every bullet must fit on a single line.

Cover exactly these three areas:

**Accessibility (ADA Compliance):**
- Door widths (32\" minimum), clearances, wheelchair routes, ramps, accessible bathrooms

**Space Efficiency:**
- Room proportions, wasted space, traffic flow, storage, layout optimization

**Best Practices:**
- Circulation between rooms, natural light, privacy, everyday functionality

Rules:
- 3 to 5 bullets per area
- One short sentence per bullet (10-15 words)
- Only mention problems or improvements; skip what is already fine
- Format each bullet as \"• Issue: brief fix\"
- No preamble, explanations, or closing remarks";

/// Sent when asking a model for an isometric rendering of the plan.
pub const ISOMETRIC_PROMPT: &str = "\
Create a 3D isometric model from this floor plan. Place the model on a dark \
surface, viewed at a 30 degree angle, with studio lighting and soft shadows.";
