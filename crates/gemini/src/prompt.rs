//! Instruction text and response schema sent with every detection call.

/// Instruction for the 1 fps, frame-labeled experiment videos.
pub const DETECTION_INSTRUCTION: &str = "\
You are reviewing a video recorded during a behavioral experiment.

The video plays at 1 frame per second. Every frame shows its index in the
top-right corner as \"Frame N\", starting at \"Frame 0\". Always report frame
indices by reading that label; never derive them from timestamps.

Two mice are visible:
- L is the mouse on the left half of the screen.
- R is the mouse on the right half of the screen.
Left and right refer to the screen, not to the animals' own bodies.

An experimenter touches the left hind paw of each mouse with a small brush.

For each mouse report a single frame index: the FIRST frame in which the
brush bristles are in full contact with the paw, pressing against it. Frames
where the brush only approaches, grazes the edge, or touches partially do
not count.

Report null for a mouse, and say why in notes, when:
- the mouse is never brushed,
- the mouse is brushed more than once,
- you cannot tell with confidence whether exactly one full contact happened.
Never guess.

Answer with a single JSON object and nothing else:
{\"L\": integer or null, \"R\": integer or null, \"notes\": string}
";

/// Structured-output schema matching the result shape.
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "L": {
                "type": "integer",
                "nullable": true,
                "description": "First frame of full brush contact for the screen-left mouse.",
            },
            "R": {
                "type": "integer",
                "nullable": true,
                "description": "First frame of full brush contact for the screen-right mouse.",
            },
            "notes": { "type": "string" },
        },
        "required": ["L", "R", "notes"],
    })
}
